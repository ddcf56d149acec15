use std::time::Duration;

use sketchboard::limits::{MAX_STROKES_PER_ROOM, MAX_USERS_PER_ROOM};
use sketchboard::protocol::{ErrorCode, Point};
use sketchboard::room::{Room, SessionHandle, Stroke, UserInfo};

use crate::common::TestPeer;

fn member(n: usize) -> (UserInfo, tokio::sync::mpsc::Receiver<String>) {
    let (handle, rx) = SessionHandle::channel();
    (
        UserInfo::new(
            format!("user-{n}"),
            format!("member-{n}"),
            "#FF5733".to_string(),
            handle,
        ),
        rx,
    )
}

fn stroke(id: &str, owner: &str, seq: u64) -> Stroke {
    Stroke {
        stroke_id: id.to_string(),
        owner_id: owner.to_string(),
        points: vec![Point(0.0, 0.0)],
        color: "#000000".to_string(),
        width: 2.0,
        complete: true,
        seq,
    }
}

// --- Capacity ---

#[test]
fn test_capacity_limit() {
    let room = Room::new("room-1".to_string(), None);
    let mut receivers = Vec::new();
    for n in 0..MAX_USERS_PER_ROOM {
        let (user, rx) = member(n);
        receivers.push(rx);
        assert!(room.add_participant(user).is_ok());
    }
    assert_eq!(room.member_count(), MAX_USERS_PER_ROOM);

    let (overflow, _rx) = member(99);
    assert_eq!(room.add_participant(overflow), Err(ErrorCode::RoomFull));
    assert_eq!(room.member_count(), MAX_USERS_PER_ROOM);
}

// --- Membership & cursors ---

#[test]
fn test_remove_participant_is_idempotent() {
    let room = Room::new("room-1".to_string(), None);
    let (user, _rx) = member(0);
    room.add_participant(user).unwrap();

    assert!(room.remove_participant("user-0"));
    assert!(!room.remove_participant("user-0"));
    assert_eq!(room.member_count(), 0);
}

#[test]
fn test_cursor_update_unknown_user_is_noop() {
    let room = Room::new("room-1".to_string(), None);
    // No members at all; must not panic or create a cursor entry.
    room.update_cursor("user-ghost", 5.0, 5.0);
    assert_eq!(room.member_count(), 0);
}

// --- Password ---

#[test]
fn test_password_validation() {
    let open = Room::new("room-1".to_string(), None);
    assert!(open.validate_password(None));
    assert!(open.validate_password(Some("anything")));

    let locked = Room::new("room-2".to_string(), Some("p".to_string()));
    assert!(locked.validate_password(Some("p")));
    assert!(!locked.validate_password(Some("x")));
    assert!(!locked.validate_password(Some("")));
    assert!(!locked.validate_password(None));
}

#[test]
fn test_empty_password_means_open_room() {
    let room = Room::new("room-1".to_string(), Some(String::new()));
    assert!(!room.has_password());
    assert!(room.validate_password(None));
}

// --- Stroke history ---

#[test]
fn test_stroke_fifo_eviction() {
    let room = Room::new("room-1".to_string(), None);
    for n in 0..(MAX_STROKES_PER_ROOM + 25) {
        room.add_stroke(stroke(&format!("s{n}"), "user-0", n as u64));
    }
    assert_eq!(room.stroke_count(), MAX_STROKES_PER_ROOM);

    // Oldest evicted from the front; newest preserved.
    assert!(room.get_stroke("s0").is_none());
    assert!(room.get_stroke("s24").is_none());
    assert!(room.get_stroke("s25").is_some());
    assert!(room
        .get_stroke(&format!("s{}", MAX_STROKES_PER_ROOM + 24))
        .is_some());
}

#[test]
fn test_snapshot_returns_tail_in_insertion_order() {
    let room = Room::new("room-1".to_string(), None);
    for n in 0..10 {
        room.add_stroke(stroke(&format!("s{n}"), "user-0", n));
    }

    let snapshot = room.strokes_snapshot(3);
    let ids: Vec<&str> = snapshot
        .iter()
        .map(|s| s["strokeId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s7", "s8", "s9"]);
}

// --- Sequence counter ---

#[test]
fn test_next_sequence_is_strictly_monotonic() {
    let room = Room::new("room-1".to_string(), None);
    let mut last = room.next_sequence();
    for _ in 0..100 {
        let next = room.next_sequence();
        assert!(next > last);
        last = next;
    }
    assert_eq!(room.snapshot_seq(), last);
}

// --- Broadcast ---

#[test]
fn test_broadcast_skips_excluded_and_dead_sessions() {
    let room = Room::new("room-1".to_string(), None);

    let (alice, mut alice_rx) = member(1);
    let (bob, mut bob_rx) = member(2);
    room.add_participant(alice).unwrap();
    room.add_participant(bob).unwrap();

    // Carol's session is already gone.
    let carol = UserInfo::new(
        "user-3".to_string(),
        "carol".to_string(),
        "#3357FF".to_string(),
        TestPeer::dead_handle(),
    );
    room.add_participant(carol).unwrap();

    room.broadcast("hello", Some("user-1"));

    assert!(alice_rx.try_recv().is_err(), "excluded user got the frame");
    assert_eq!(bob_rx.try_recv().unwrap(), "hello");
    // The dead handle is skipped without disturbing anyone.
    assert_eq!(room.member_count(), 3);
}

// --- Ghosts ---

#[test]
fn test_ghost_users() {
    let room = Room::new("room-1".to_string(), None);
    let (user, _rx) = member(0);
    room.add_participant(user).unwrap();

    assert!(room.ghost_users(Duration::from_secs(60)).is_empty());
    std::thread::sleep(Duration::from_millis(15));
    assert_eq!(
        room.ghost_users(Duration::from_millis(1)),
        vec!["user-0".to_string()]
    );

    // Activity clears ghost status.
    room.touch("user-0");
    assert!(room.ghost_users(Duration::from_millis(10)).is_empty());
}
