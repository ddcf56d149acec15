use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, State};

use crate::limits::GHOST_CURSOR_TIMEOUT_MS;
use crate::registry::RoomRegistry;

/// Read-only room directory. The wire protocol is authoritative; these
/// endpoints exist for dashboards and poking at a running server.
#[get("/api/v1/rooms")]
pub fn list_rooms(registry: &State<Arc<RoomRegistry>>) -> Json<Vec<serde_json::Value>> {
    let rooms = registry
        .rooms()
        .iter()
        .map(|room| {
            serde_json::json!({
                "roomId": room.room_id,
                "users": room.member_count(),
                "strokes": room.stroke_count(),
                "hasPassword": room.has_password(),
            })
        })
        .collect();
    Json(rooms)
}

#[get("/api/v1/rooms/<room_id>")]
pub fn get_room(
    registry: &State<Arc<RoomRegistry>>,
    room_id: &str,
) -> Result<Json<serde_json::Value>, (Status, Json<serde_json::Value>)> {
    let Some(room) = registry.get(room_id) else {
        return Err((
            Status::NotFound,
            Json(serde_json::json!({"error": "Room not found"})),
        ));
    };

    let ghosts = crate::presence::ghost_users(&room, Some(GHOST_CURSOR_TIMEOUT_MS));
    Ok(Json(serde_json::json!({
        "roomId": room.room_id,
        "users": room.member_entries(),
        "strokes": room.stroke_count(),
        "hasPassword": room.has_password(),
        "ghostUsers": ghosts,
        "seq": room.snapshot_seq(),
    })))
}
