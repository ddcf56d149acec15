//! Authoritative per-room state: members, cursors, stroke history, and the
//! broadcast primitive. One mutex guards all of it; the sequence counter is
//! an atomic outside the lock so message construction never deadlocks.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::limits::{MAX_STROKES_PER_ROOM, MAX_USERS_PER_ROOM, SESSION_OUTBOX_DEPTH};
use crate::protocol::{ErrorCode, Point};

/// Non-owning handle to a session's write queue.
///
/// Holding a `SessionHandle` never keeps a session alive: when the session
/// loop ends it drops the receiving half, and every later `try_send` is a
/// silent no-op. Broadcast loops rely on that to skip dead peers.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<String>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Handle plus its receiving half, using the standard outbox depth.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SESSION_OUTBOX_DEPTH);
        (Self { tx }, rx)
    }

    /// Enqueue without blocking. Returns false when the peer is gone or its
    /// outbox is saturated; the caller drops the message either way so one
    /// slow peer cannot stall the room.
    pub fn try_send(&self, text: &str) -> bool {
        self.tx.try_send(text.to_string()).is_ok()
    }
}

/// One room member.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
    pub handle: SessionHandle,
    pub last_activity: Instant,
}

impl UserInfo {
    pub fn new(user_id: String, user_name: String, color: String, handle: SessionHandle) -> Self {
        Self {
            user_id,
            user_name,
            color,
            handle,
            last_activity: Instant::now(),
        }
    }

    pub fn is_ghost(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Latest cursor position per member. No history; each update overwrites.
#[derive(Debug, Clone)]
pub struct CursorState {
    pub user_id: String,
    pub x: f32,
    pub y: f32,
    pub last_update: Instant,
    pub visible: bool,
}

/// An ordered polyline drawn by one user. `owner_id` never changes; points
/// only grow while `complete` is false; after completion the stroke may
/// only be translated as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct Stroke {
    #[serde(rename = "strokeId")]
    pub stroke_id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub points: Vec<Point>,
    pub color: String,
    pub width: f32,
    pub complete: bool,
    #[serde(skip)]
    pub seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RoomState {
    pub(crate) members: HashMap<String, UserInfo>,
    pub(crate) cursors: HashMap<String, CursorState>,
    pub(crate) strokes: VecDeque<Stroke>,
}

#[derive(Debug)]
pub struct Room {
    pub room_id: String,
    password: Option<String>,
    state: Mutex<RoomState>,
    seq: AtomicU64,
}

impl Room {
    pub fn new(room_id: String, password: Option<String>) -> Self {
        // An empty password string is the same as no password.
        let password = password.filter(|p| !p.is_empty());
        Self {
            room_id,
            password,
            state: Mutex::new(RoomState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// True if the room has no password, else string-equal.
    pub fn validate_password(&self, supplied: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => supplied == Some(expected.as_str()),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch-and-increment of the room sequence. Atomic and independent of
    /// the state lock, so message-construction sites never contend.
    pub fn next_sequence(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current counter value without advancing it (`snapshotSeq`).
    pub fn snapshot_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Insert a member and an origin-cursor entry. Fails when at capacity.
    pub fn add_participant(&self, user: UserInfo) -> Result<(), ErrorCode> {
        let mut state = self.lock();
        Self::add_participant_locked(&mut state, user)
    }

    pub(crate) fn add_participant_locked(
        state: &mut RoomState,
        user: UserInfo,
    ) -> Result<(), ErrorCode> {
        if state.members.len() >= MAX_USERS_PER_ROOM {
            return Err(ErrorCode::RoomFull);
        }
        state.cursors.insert(
            user.user_id.clone(),
            CursorState {
                user_id: user.user_id.clone(),
                x: 0.0,
                y: 0.0,
                last_update: Instant::now(),
                visible: false,
            },
        );
        state.members.insert(user.user_id.clone(), user);
        Ok(())
    }

    /// Remove a member and its cursor. Idempotent; returns whether the
    /// member existed.
    pub fn remove_participant(&self, user_id: &str) -> bool {
        let mut state = self.lock();
        state.cursors.remove(user_id);
        state.members.remove(user_id).is_some()
    }

    /// Overwrite a member's cursor and touch its activity timestamp.
    /// No-op for unknown users.
    pub fn update_cursor(&self, user_id: &str, x: f32, y: f32) {
        let mut state = self.lock();
        Self::update_cursor_locked(&mut state, user_id, x, y);
    }

    pub(crate) fn update_cursor_locked(state: &mut RoomState, user_id: &str, x: f32, y: f32) {
        let Some(member) = state.members.get_mut(user_id) else {
            return;
        };
        member.last_activity = Instant::now();
        if let Some(cursor) = state.cursors.get_mut(user_id) {
            cursor.x = x;
            cursor.y = y;
            cursor.last_update = Instant::now();
            cursor.visible = true;
        }
    }

    /// Touch a member's activity timestamp. No-op for unknown users.
    pub fn touch(&self, user_id: &str) {
        let mut state = self.lock();
        if let Some(member) = state.members.get_mut(user_id) {
            member.last_activity = Instant::now();
        }
    }

    /// Append a stroke, evicting from the front while over the history bound.
    pub fn add_stroke(&self, stroke: Stroke) {
        let mut state = self.lock();
        Self::add_stroke_locked(&mut state, stroke);
    }

    pub(crate) fn add_stroke_locked(state: &mut RoomState, stroke: Stroke) {
        state.strokes.push_back(stroke);
        while state.strokes.len() > MAX_STROKES_PER_ROOM {
            state.strokes.pop_front();
        }
    }

    /// Clone of the stroke with the given id, if any. When ids collide the
    /// most recently started stroke wins, matching the mutation path.
    pub fn get_stroke(&self, stroke_id: &str) -> Option<Stroke> {
        let state = self.lock();
        state
            .strokes
            .iter()
            .rev()
            .find(|s| s.stroke_id == stroke_id)
            .cloned()
    }

    /// The last `limit` strokes in insertion order, as wire JSON.
    pub fn strokes_snapshot(&self, limit: usize) -> Vec<serde_json::Value> {
        let state = self.lock();
        Self::strokes_snapshot_locked(&state, limit)
    }

    pub(crate) fn strokes_snapshot_locked(state: &RoomState, limit: usize) -> Vec<serde_json::Value> {
        let skip = state.strokes.len().saturating_sub(limit);
        state
            .strokes
            .iter()
            .skip(skip)
            .map(|s| serde_json::to_value(s).expect("serialize stroke"))
            .collect()
    }

    /// Enqueue a prebuilt frame to every live member except `exclude`.
    pub fn broadcast(&self, text: &str, exclude: Option<&str>) {
        let state = self.lock();
        Self::send_to_members(&state, text, exclude);
    }

    /// Broadcast while already holding the state lock. Dead handles and
    /// saturated outboxes are skipped silently.
    pub(crate) fn send_to_members(state: &RoomState, text: &str, exclude: Option<&str>) {
        for member in state.members.values() {
            if exclude == Some(member.user_id.as_str()) {
                continue;
            }
            member.handle.try_send(text);
        }
    }

    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }

    pub fn stroke_count(&self) -> usize {
        self.lock().strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }

    /// Mark cursors of ghost members invisible. Returns how many flipped.
    pub fn hide_ghost_cursors(&self, timeout: Duration) -> usize {
        let mut state = self.lock();
        let ghosts: Vec<String> = state
            .members
            .values()
            .filter(|m| m.is_ghost(timeout))
            .map(|m| m.user_id.clone())
            .collect();

        let mut hidden = 0;
        for user_id in ghosts {
            if let Some(cursor) = state.cursors.get_mut(&user_id) {
                if cursor.visible {
                    cursor.visible = false;
                    hidden += 1;
                }
            }
        }
        hidden
    }

    /// Member ids whose last activity is older than `timeout`.
    pub fn ghost_users(&self, timeout: Duration) -> Vec<String> {
        let state = self.lock();
        state
            .members
            .values()
            .filter(|m| m.is_ghost(timeout))
            .map(|m| m.user_id.clone())
            .collect()
    }

    /// Full member roster with live cursor state, for the HTTP room view.
    pub fn member_entries(&self) -> Vec<serde_json::Value> {
        let state = self.lock();
        state
            .members
            .values()
            .map(|m| {
                let cursor = state.cursors.get(&m.user_id);
                serde_json::json!({
                    "userId": m.user_id,
                    "name": m.user_name,
                    "color": m.color,
                    "cursor": cursor.map(|c| {
                        serde_json::json!({ "x": c.x, "y": c.y, "visible": c.visible })
                    }),
                })
            })
            .collect()
    }

    /// `{userId, name, color}` entries for the member list, excluding one
    /// user (the joiner building its own welcome).
    pub fn member_list(&self, exclude: &str) -> Vec<serde_json::Value> {
        let state = self.lock();
        Self::member_list_locked(&state, exclude)
    }

    pub(crate) fn member_list_locked(state: &RoomState, exclude: &str) -> Vec<serde_json::Value> {
        state
            .members
            .values()
            .filter(|m| m.user_id != exclude)
            .map(|m| {
                serde_json::json!({
                    "userId": m.user_id,
                    "name": m.user_name,
                    "color": m.color,
                })
            })
            .collect()
    }
}
