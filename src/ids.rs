use uuid::Uuid;

/// Generate a full UUIDv4 string.
pub fn uuid_v4() -> String {
    Uuid::new_v4().to_string()
}

/// Short hex id: first 8 hex characters of a UUIDv4.
/// Used where a full UUID is overkill (stroke ids minted server-side, test fixtures).
pub fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Server-assigned user id, unique for the process lifetime.
pub fn user_id() -> String {
    format!("user-{}", Uuid::new_v4())
}

/// Room id for rooms created without a client-chosen name.
pub fn room_id() -> String {
    format!("room-{}", short_hex())
}

/// Stroke id for server-minted strokes.
pub fn stroke_id() -> String {
    format!("stroke-{}", short_hex())
}
