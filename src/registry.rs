//! Process-wide room registry: lazy room creation, the rotating color
//! palette, join/leave orchestration, and grace-period deletion of empty
//! rooms.
//!
//! Lock discipline: the registry's own locks (room map, pending-deletion
//! map) are never held across a room's state lock. Join and leave clone the
//! `Arc<Room>` out of the map first, then work on the room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::board;
use crate::ids;
use crate::limits::{ServerConfig, COLOR_PALETTE};
use crate::protocol::{outbound, ErrorCode};
use crate::rate_limit::CursorLimiter;
use crate::room::{Room, SessionHandle, UserInfo};

/// Seconds between deletion sweeps.
const SWEEP_INTERVAL_SECS: u64 = 5;

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    pub room: Arc<Room>,
    pub user_id: String,
    pub color: String,
}

pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    /// Empty rooms awaiting deletion, by deadline. A join cancels the entry.
    pending_delete: Mutex<HashMap<String, Instant>>,
    palette_index: AtomicUsize,
    limiter: CursorLimiter,
    grace: Duration,
}

impl RoomRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            pending_delete: Mutex::new(HashMap::new()),
            palette_index: AtomicUsize::new(0),
            limiter: CursorLimiter::new(config.cursor_rate, config.cursor_burst),
            grace: Duration::from_secs(config.room_grace_secs),
        }
    }

    pub fn limiter(&self) -> &CursorLimiter {
        &self.limiter
    }

    /// Return the room, creating it with `password` if absent. The password
    /// supplied at creation time is the room's password forever; later
    /// callers are validated against it, never replacing it. Cancels a
    /// pending deletion so a rejoin during the grace period finds the
    /// preserved board.
    pub fn get_or_create(&self, room_id: &str, password: Option<&str>) -> Arc<Room> {
        let room = {
            let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            rooms
                .entry(room_id.to_string())
                .or_insert_with(|| {
                    println!("🎨 Room {room_id} created");
                    Arc::new(Room::new(room_id.to_string(), password.map(String::from)))
                })
                .clone()
        };
        let mut pending = self.pending_delete.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(room_id);
        room
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.get(room_id).cloned()
    }

    /// Join a user into a room: password gate, capacity gate, fresh user id
    /// and palette color, `welcome` + `room_state` to the joiner, and
    /// `user_joined` to existing peers — all under one room lock so every
    /// peer observes the same order.
    pub fn join(
        &self,
        room_id: &str,
        user_name: &str,
        password: Option<&str>,
        handle: SessionHandle,
    ) -> Result<JoinOutcome, ErrorCode> {
        let room = self.get_or_create(room_id, password);

        if !room.validate_password(password) {
            return Err(ErrorCode::InvalidPassword);
        }

        let user_id = ids::user_id();
        let color;

        {
            let mut state = room.lock();
            // Gate capacity before taking a palette slot; a rejected join
            // must not advance the color rotation.
            if state.members.len() >= crate::limits::MAX_USERS_PER_ROOM {
                return Err(ErrorCode::RoomFull);
            }
            color = self.next_color();
            let user = UserInfo::new(
                user_id.clone(),
                user_name.to_string(),
                color.clone(),
                handle.clone(),
            );
            Room::add_participant_locked(&mut state, user)?;

            let users = Room::member_list_locked(&state, &user_id);
            let welcome = outbound::welcome(room.next_sequence(), &user_id, &color, users);
            handle.try_send(&welcome.to_text());

            let snapshot = board::snapshot_locked(&room, &state);
            handle.try_send(&snapshot.to_text());

            let joined = outbound::user_joined(room.next_sequence(), &user_id, user_name, &color);
            Room::send_to_members(&state, &joined.to_text(), Some(&user_id));
        }

        println!("👋 {user_name} joined {room_id} as {user_id}");
        Ok(JoinOutcome { room, user_id, color })
    }

    /// Remove a user from a room, announce `user_left`, and schedule the
    /// room for deletion once it has emptied.
    pub fn leave(&self, room_id: &str, user_id: &str) {
        let Some(room) = self.get(room_id) else {
            return;
        };

        let now_empty = {
            let mut state = room.lock();
            state.cursors.remove(user_id);
            if state.members.remove(user_id).is_some() {
                let frame = outbound::user_left(room.next_sequence(), user_id);
                Room::send_to_members(&state, &frame.to_text(), None);
            }
            state.members.is_empty()
        };

        crate::presence::remove_user(&self.limiter, room_id, user_id);

        if now_empty {
            let mut pending = self.pending_delete.lock().unwrap_or_else(|e| e.into_inner());
            pending.insert(room_id.to_string(), Instant::now() + self.grace);
            println!(
                "🕐 Room {room_id} is empty; deleting in {}s unless someone rejoins",
                self.grace.as_secs()
            );
        }
    }

    /// Delete rooms whose grace deadline elapsed and which are still empty.
    /// Returns the number deleted.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let due: Vec<String> = {
            let pending = self.pending_delete.lock().unwrap_or_else(|e| e.into_inner());
            pending
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut deleted = 0;
        for room_id in due {
            // Room lock is taken before the registry locks, never inside them.
            let empty = self.get(&room_id).map(|r| r.is_empty()).unwrap_or(true);

            let mut pending = self.pending_delete.lock().unwrap_or_else(|e| e.into_inner());
            // Re-check under the lock: a join since collection cancels the entry.
            let deadline = pending.get(&room_id).copied();
            if matches!(deadline, Some(d) if d <= now) {
                pending.remove(&room_id);
                if empty {
                    let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
                    rooms.remove(&room_id);
                    deleted += 1;
                    println!("🧹 Room {room_id} deleted after grace period");
                }
            }
        }
        deleted
    }

    fn next_color(&self) -> String {
        let index = self.palette_index.fetch_add(1, Ordering::SeqCst);
        COLOR_PALETTE[index % COLOR_PALETTE.len()].to_string()
    }

    /// Clones of every live room, for iteration outside the registry lock.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        let map = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        map.values().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn pending_delete_count(&self) -> usize {
        self.pending_delete
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn total_members(&self) -> usize {
        let rooms: Vec<Arc<Room>> = {
            let map = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            map.values().cloned().collect()
        };
        rooms.iter().map(|r| r.member_count()).sum()
    }

    pub fn total_strokes(&self) -> usize {
        let rooms: Vec<Arc<Room>> = {
            let map = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            map.values().cloned().collect()
        };
        rooms.iter().map(|r| r.stroke_count()).sum()
    }
}

/// Spawns the background task that deletes rooms whose grace period
/// elapsed and hides ghost cursors. Runs for the lifetime of the process.
pub fn spawn_sweeper(registry: Arc<RoomRegistry>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
            registry.sweep();
            for room in registry.rooms() {
                crate::presence::sweep_ghost_cursors(&room);
            }
        }
    });
}
