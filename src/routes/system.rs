use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, State};

use crate::registry::RoomRegistry;

/// Liveness probe. Plain text so the humblest monitor can parse it.
#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/api/v1/stats")]
pub fn stats(registry: &State<Arc<RoomRegistry>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "sketchboard",
        "version": env!("CARGO_PKG_VERSION"),
        "mdns_service": crate::mdns::service_type(),
        "rooms": registry.room_count(),
        "users": registry.total_members(),
        "strokes": registry.total_strokes(),
        "rooms_pending_deletion": registry.pending_delete_count(),
    }))
}
