//! Cursor presence: rate-gated cursor updates, activity touches, and ghost
//! detection. Presence is loss-tolerant by design; a rejected update is
//! dropped without an error frame.

use std::time::Duration;

use crate::limits::GHOST_CURSOR_TIMEOUT_MS;
use crate::protocol::{outbound, ErrorCode};
use crate::rate_limit::CursorLimiter;
use crate::room::Room;

/// Apply one cursor update from `user_id` and fan it out to peers.
///
/// Consults the per-(room, user) limiter first: a rejected update returns
/// `RATE_LIMITED` and changes nothing. The dispatcher discards that result
/// silently; presence updates are never error-answered.
pub fn cursor_move(
    room: &Room,
    limiter: &CursorLimiter,
    user_id: &str,
    x: f32,
    y: f32,
) -> Result<(), ErrorCode> {
    if !limiter.check(&room.room_id, user_id) {
        return Err(ErrorCode::RateLimited);
    }

    let mut state = room.lock();
    if !state.members.contains_key(user_id) {
        // Raced with a leave; nothing to update, nothing to announce.
        return Ok(());
    }
    Room::update_cursor_locked(&mut state, user_id, x, y);

    let frame = outbound::cursor_move(room.next_sequence(), user_id, x, y);
    Room::send_to_members(&state, &frame.to_text(), Some(user_id));
    Ok(())
}

/// Record activity from `user_id`; called on every non-presence mutation.
pub fn touch(room: &Room, user_id: &str) {
    room.touch(user_id);
}

/// Members whose last activity is older than `timeout_ms`
/// (default [`GHOST_CURSOR_TIMEOUT_MS`]). Ghosts still count toward
/// capacity until they leave.
pub fn ghost_users(room: &Room, timeout_ms: Option<u64>) -> Vec<String> {
    let timeout = Duration::from_millis(timeout_ms.unwrap_or(GHOST_CURSOR_TIMEOUT_MS));
    room.ghost_users(timeout)
}

/// Drop a user's limiter bucket on disconnect.
pub fn remove_user(limiter: &CursorLimiter, room_id: &str, user_id: &str) {
    limiter.remove(room_id, user_id);
}

/// Hide the cursors of ghost members. Ghosts keep their membership (and
/// their capacity slot) until they leave; only their cursor stops being
/// shown as live. Returns the number of cursors newly hidden.
pub fn sweep_ghost_cursors(room: &Room) -> usize {
    room.hide_ghost_cursors(Duration::from_millis(GHOST_CURSOR_TIMEOUT_MS))
}
