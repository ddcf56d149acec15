//! Drawing operations: stroke lifecycle, ownership and size enforcement,
//! and the `room_state` snapshot. Every operation mutates, samples the room
//! sequence, and broadcasts under one state lock so peers observe
//! `start → add* → end → move*` in order.

use crate::limits::{MAX_POINTS_PER_STROKE, SNAPSHOT_STROKE_LIMIT};
use crate::protocol::{outbound, ErrorCode, Outbound, Point};
use crate::room::{Room, RoomState, Stroke};

/// Create a stroke owned by `user_id` and announce it to peers.
///
/// Any stroke id is accepted; a colliding id inserts a fresh stroke, and
/// later mutations resolve to the most recent stroke with that id, so a
/// collision can never touch an older stroke with a different owner.
pub fn stroke_start(room: &Room, user_id: &str, stroke_id: &str, color: &str, width: f32) {
    let mut state = room.lock();
    if let Some(member) = state.members.get_mut(user_id) {
        member.last_activity = std::time::Instant::now();
    }

    let stroke = Stroke {
        stroke_id: stroke_id.to_string(),
        owner_id: user_id.to_string(),
        points: Vec::new(),
        color: color.to_string(),
        width,
        complete: false,
        seq: room.next_sequence(),
    };
    let frame = outbound::stroke_start(room.next_sequence(), &stroke);
    Room::add_stroke_locked(&mut state, stroke);
    Room::send_to_members(&state, &frame.to_text(), Some(user_id));
}

/// Append points to an open stroke owned by `user_id`.
pub fn stroke_add(
    room: &Room,
    user_id: &str,
    stroke_id: &str,
    points: &[Point],
) -> Result<(), ErrorCode> {
    let mut state = room.lock();

    let stroke = owned_stroke_mut(&mut state, user_id, stroke_id)?;
    if stroke.complete {
        return Err(ErrorCode::InvalidStroke);
    }
    if stroke.points.len() + points.len() > MAX_POINTS_PER_STROKE {
        return Err(ErrorCode::StrokeTooLarge);
    }
    stroke.points.extend_from_slice(points);

    if let Some(member) = state.members.get_mut(user_id) {
        member.last_activity = std::time::Instant::now();
    }

    let frame = outbound::stroke_add(room.next_sequence(), user_id, stroke_id, points);
    Room::send_to_members(&state, &frame.to_text(), Some(user_id));
    Ok(())
}

/// Mark a stroke complete. A second call for an already-complete stroke is
/// a no-op with no broadcast.
pub fn stroke_end(room: &Room, user_id: &str, stroke_id: &str) -> Result<(), ErrorCode> {
    let mut state = room.lock();

    let stroke = owned_stroke_mut(&mut state, user_id, stroke_id)?;
    if stroke.complete {
        return Ok(());
    }
    stroke.complete = true;

    if let Some(member) = state.members.get_mut(user_id) {
        member.last_activity = std::time::Instant::now();
    }

    let frame = outbound::stroke_end(room.next_sequence(), user_id, stroke_id);
    Room::send_to_members(&state, &frame.to_text(), Some(user_id));
    Ok(())
}

/// Translate a completed stroke by `(dx, dy)`. Open strokes cannot move.
pub fn stroke_move(
    room: &Room,
    user_id: &str,
    stroke_id: &str,
    dx: f32,
    dy: f32,
) -> Result<(), ErrorCode> {
    let mut state = room.lock();

    let stroke = owned_stroke_mut(&mut state, user_id, stroke_id)?;
    if !stroke.complete {
        return Err(ErrorCode::InvalidStroke);
    }
    for point in &mut stroke.points {
        point.0 += dx;
        point.1 += dy;
    }

    if let Some(member) = state.members.get_mut(user_id) {
        member.last_activity = std::time::Instant::now();
    }

    let frame = outbound::stroke_move(room.next_sequence(), user_id, stroke_id, dx, dy);
    Room::send_to_members(&state, &frame.to_text(), Some(user_id));
    Ok(())
}

/// Build the `room_state` frame for a joiner: the last
/// `SNAPSHOT_STROKE_LIMIT` strokes in insertion order plus the current
/// room sequence as `snapshotSeq`.
pub fn snapshot(room: &Room) -> Outbound {
    let state = room.lock();
    snapshot_locked(room, &state)
}

pub(crate) fn snapshot_locked(room: &Room, state: &RoomState) -> Outbound {
    let strokes = Room::strokes_snapshot_locked(state, SNAPSHOT_STROKE_LIMIT);
    outbound::room_state(room.next_sequence(), strokes, room.snapshot_seq())
}

/// Most recent stroke with this id, owned by `user_id`. The scan runs from
/// the back so id collisions resolve to the newest stroke.
fn owned_stroke_mut<'a>(
    state: &'a mut RoomState,
    user_id: &str,
    stroke_id: &str,
) -> Result<&'a mut Stroke, ErrorCode> {
    let stroke = state
        .strokes
        .iter_mut()
        .rev()
        .find(|s| s.stroke_id == stroke_id)
        .ok_or(ErrorCode::InvalidStroke)?;
    if stroke.owner_id != user_id {
        return Err(ErrorCode::InvalidStroke);
    }
    Ok(stroke)
}
