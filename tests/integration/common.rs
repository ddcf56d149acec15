//! Shared helpers: a channel-backed peer that drives the dispatcher the way
//! a live WebSocket session would, minus the socket.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use sketchboard::dispatch::{self, Connection};
use sketchboard::limits::ServerConfig;
use sketchboard::registry::RoomRegistry;
use sketchboard::room::SessionHandle;

pub fn registry() -> RoomRegistry {
    RoomRegistry::new(&ServerConfig::default())
}

pub fn registry_with_grace(grace_secs: u64) -> RoomRegistry {
    let config = ServerConfig {
        room_grace_secs: grace_secs,
        ..ServerConfig::default()
    };
    RoomRegistry::new(&config)
}

/// One fake connection: a dispatcher-side [`Connection`] plus the receiving
/// half of its outbox, so tests can observe exactly what the server sent.
pub struct TestPeer {
    pub conn: Connection,
    rx: mpsc::Receiver<String>,
}

impl TestPeer {
    pub fn new() -> Self {
        let (handle, rx) = SessionHandle::channel();
        Self {
            conn: Connection::new(handle),
            rx,
        }
    }

    /// A handle whose session is already gone; sends to it are no-ops.
    pub fn dead_handle() -> SessionHandle {
        let (handle, rx) = SessionHandle::channel();
        drop(rx);
        handle
    }

    pub fn send(&mut self, registry: &RoomRegistry, frame: Value) {
        dispatch::dispatch(registry, &mut self.conn, &frame.to_string());
    }

    pub fn send_raw(&mut self, registry: &RoomRegistry, raw: &str) {
        dispatch::dispatch(registry, &mut self.conn, raw);
    }

    /// Drain every queued outbound frame, parsed back to JSON.
    pub fn recv_all(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            frames.push(serde_json::from_str(&text).expect("outbound frame is JSON"));
        }
        frames
    }

    /// Join a room and return the assigned user id. Drains the welcome and
    /// room_state frames as a side effect.
    pub fn join(&mut self, registry: &RoomRegistry, room_id: &str, name: &str) -> String {
        self.send(registry, join_frame(room_id, name, None));
        let frames = self.recv_all();
        let welcome = frames
            .iter()
            .find(|f| f["type"] == "welcome")
            .expect("join produced a welcome frame");
        welcome["data"]["userId"].as_str().unwrap().to_string()
    }

    pub fn user_id(&self) -> String {
        self.conn.user_id().expect("peer has joined").to_string()
    }
}

// --- Frame builders ---

pub fn join_frame(room_id: &str, user_name: &str, password: Option<&str>) -> Value {
    let mut data = json!({ "roomId": room_id, "userName": user_name });
    if let Some(p) = password {
        data["password"] = json!(p);
    }
    json!({ "type": "join_room", "seq": 1, "data": data })
}

pub fn cursor_frame(x: f64, y: f64) -> Value {
    json!({ "type": "cursor_move", "seq": 1, "data": { "x": x, "y": y } })
}

pub fn stroke_start_frame(stroke_id: &str, color: &str, width: f64) -> Value {
    json!({
        "type": "stroke_start",
        "seq": 1,
        "data": { "strokeId": stroke_id, "color": color, "width": width },
    })
}

pub fn stroke_add_frame(stroke_id: &str, points: Vec<[f64; 2]>) -> Value {
    json!({
        "type": "stroke_add",
        "seq": 1,
        "data": { "strokeId": stroke_id, "points": points },
    })
}

pub fn stroke_end_frame(stroke_id: &str) -> Value {
    json!({ "type": "stroke_end", "seq": 1, "data": { "strokeId": stroke_id } })
}

pub fn stroke_move_frame(stroke_id: &str, dx: f64, dy: f64) -> Value {
    json!({
        "type": "stroke_move",
        "seq": 1,
        "data": { "strokeId": stroke_id, "dx": dx, "dy": dy },
    })
}

/// Assert that `frames` carry strictly increasing envelope seq values.
pub fn assert_strictly_increasing(frames: &[Value]) {
    let seqs: Vec<u64> = frames.iter().map(|f| f["seq"].as_u64().unwrap()).collect();
    for pair in seqs.windows(2) {
        assert!(pair[0] < pair[1], "seq not strictly increasing: {seqs:?}");
    }
}
