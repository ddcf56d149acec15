//! Wire protocol: the JSON message envelope, inbound parsing and field
//! validation, and constructors for every outbound frame.
//!
//! Envelope shape: `{"type": string, "seq": u64, "timestamp": i64 ms, "data": object}`.
//! Points travel as `[[x, y], ...]` arrays, never objects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::room::Stroke;

/// A 2D point. Serializes as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f32, pub f32);

/// Wire-visible error codes. The dispatcher decides per category whether a
/// code is surfaced as an `error` frame or only logged server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    InvalidPassword,
    MalformedMessage,
    InvalidMessageType,
    MissingField,
    InvalidField,
    RateLimited,
    InvalidStroke,
    StrokeTooLarge,
    NotInRoom,
    AlreadyInRoom,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::InvalidPassword => "INVALID_PASSWORD",
            ErrorCode::MalformedMessage => "MALFORMED_MESSAGE",
            ErrorCode::InvalidMessageType => "INVALID_MESSAGE_TYPE",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidField => "INVALID_FIELD",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidStroke => "INVALID_STROKE",
            ErrorCode::StrokeTooLarge => "STROKE_TOO_LARGE",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::AlreadyInRoom => "ALREADY_IN_ROOM",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::RoomNotFound => "Room not found",
            ErrorCode::RoomFull => "Room is at capacity",
            ErrorCode::InvalidPassword => "Invalid room password",
            ErrorCode::MalformedMessage => "Message is not a JSON object",
            ErrorCode::InvalidMessageType => "Unknown message type",
            ErrorCode::MissingField => "Required field missing",
            ErrorCode::InvalidField => "Field has the wrong shape",
            ErrorCode::RateLimited => "Too many updates",
            ErrorCode::InvalidStroke => "Unknown stroke, wrong owner, or wrong state",
            ErrorCode::StrokeTooLarge => "Stroke point limit exceeded",
            ErrorCode::NotInRoom => "Join a room first",
            ErrorCode::AlreadyInRoom => "Session already joined a room",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

/// A validated client command, payload fields already shape-checked.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    JoinRoom {
        room_id: String,
        user_name: String,
        password: Option<String>,
    },
    CursorMove {
        x: f32,
        y: f32,
    },
    StrokeStart {
        stroke_id: String,
        color: String,
        width: f32,
    },
    StrokeAdd {
        stroke_id: String,
        points: Vec<Point>,
    },
    StrokeEnd {
        stroke_id: String,
    },
    StrokeMove {
        stroke_id: String,
        dx: f32,
        dy: f32,
    },
    Ping,
}

/// One parsed inbound frame: the client's envelope `seq` plus its command.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub seq: u64,
    pub command: ClientCommand,
}

/// Why an inbound frame was rejected. `kind` is carried so the dispatcher
/// can tell join failures (surfaced) from drawing failures (dropped).
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid JSON or non-object root.
    Malformed,
    /// `type` missing, non-string, or not a known message type.
    UnknownType,
    /// A required `data` field is absent.
    MissingField { kind: &'static str, field: &'static str },
    /// A `data` field is present but has the wrong shape.
    InvalidField { kind: &'static str, field: &'static str },
}

impl ParseError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::Malformed => ErrorCode::MalformedMessage,
            ParseError::UnknownType => ErrorCode::InvalidMessageType,
            ParseError::MissingField { .. } => ErrorCode::MissingField,
            ParseError::InvalidField { .. } => ErrorCode::InvalidField,
        }
    }
}

/// Parse one text frame into a validated [`Frame`].
pub fn parse_frame(text: &str) -> Result<Frame, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ParseError::Malformed)?;
    let root = value.as_object().ok_or(ParseError::Malformed)?;

    // seq defaults to 0 when absent or non-numeric
    let seq = root.get("seq").and_then(Value::as_u64).unwrap_or(0);

    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ParseError::UnknownType)?;

    let empty = Map::new();
    let data = root.get("data").and_then(Value::as_object).unwrap_or(&empty);

    let command = match kind {
        "join_room" => ClientCommand::JoinRoom {
            room_id: req_string(data, "join_room", "roomId")?,
            user_name: req_string(data, "join_room", "userName")?,
            password: opt_string(data, "join_room", "password")?,
        },
        "cursor_move" => ClientCommand::CursorMove {
            x: req_number(data, "cursor_move", "x")?,
            y: req_number(data, "cursor_move", "y")?,
        },
        "stroke_start" => ClientCommand::StrokeStart {
            stroke_id: req_string(data, "stroke_start", "strokeId")?,
            color: req_string(data, "stroke_start", "color")?,
            width: req_number(data, "stroke_start", "width")?,
        },
        "stroke_add" => ClientCommand::StrokeAdd {
            stroke_id: req_string(data, "stroke_add", "strokeId")?,
            points: req_points(data, "stroke_add", "points")?,
        },
        "stroke_end" => ClientCommand::StrokeEnd {
            stroke_id: req_string(data, "stroke_end", "strokeId")?,
        },
        "stroke_move" => ClientCommand::StrokeMove {
            stroke_id: req_string(data, "stroke_move", "strokeId")?,
            dx: req_number(data, "stroke_move", "dx")?,
            dy: req_number(data, "stroke_move", "dy")?,
        },
        "ping" => ClientCommand::Ping,
        _ => return Err(ParseError::UnknownType),
    };

    Ok(Frame { seq, command })
}

fn req_string(
    data: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, ParseError> {
    match data.get(field) {
        None => Err(ParseError::MissingField { kind, field }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ParseError::InvalidField { kind, field }),
    }
}

fn opt_string(
    data: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<String>, ParseError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::InvalidField { kind, field }),
    }
}

fn req_number(
    data: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<f32, ParseError> {
    match data.get(field) {
        None => Err(ParseError::MissingField { kind, field }),
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() => Ok(n as f32),
            _ => Err(ParseError::InvalidField { kind, field }),
        },
    }
}

fn req_points(
    data: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Vec<Point>, ParseError> {
    let raw = match data.get(field) {
        None => return Err(ParseError::MissingField { kind, field }),
        Some(Value::Array(a)) => a,
        Some(_) => return Err(ParseError::InvalidField { kind, field }),
    };

    let mut points = Vec::with_capacity(raw.len());
    for entry in raw {
        let pair = entry
            .as_array()
            .filter(|p| p.len() == 2)
            .ok_or(ParseError::InvalidField { kind, field })?;
        let x = pair[0].as_f64();
        let y = pair[1].as_f64();
        match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                points.push(Point(x as f32, y as f32));
            }
            _ => return Err(ParseError::InvalidField { kind, field }),
        }
    }
    Ok(points)
}

/// One outbound frame, ready to serialize. `seq` comes from the room
/// counter (or echoes the client for `pong`); `timestamp` is wall-clock ms
/// at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outbound {
    #[serde(rename = "type")]
    pub kind: String,
    pub seq: u64,
    pub timestamp: i64,
    pub data: Value,
}

impl Outbound {
    fn new(kind: &str, seq: u64, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            seq,
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).expect("serialize outbound frame")
    }
}

/// Outbound frame constructors, one per server→client message type.
pub mod outbound {
    use super::*;

    /// Sent to a joiner. `users` lists existing members, excluding the joiner.
    pub fn welcome(seq: u64, user_id: &str, color: &str, users: Vec<Value>) -> Outbound {
        Outbound::new(
            "welcome",
            seq,
            json!({ "userId": user_id, "color": color, "users": users }),
        )
    }

    pub fn user_joined(seq: u64, user_id: &str, name: &str, color: &str) -> Outbound {
        Outbound::new(
            "user_joined",
            seq,
            json!({ "userId": user_id, "name": name, "color": color }),
        )
    }

    pub fn user_left(seq: u64, user_id: &str) -> Outbound {
        Outbound::new("user_left", seq, json!({ "userId": user_id }))
    }

    pub fn cursor_move(seq: u64, user_id: &str, x: f32, y: f32) -> Outbound {
        Outbound::new(
            "cursor_move",
            seq,
            json!({ "userId": user_id, "x": x, "y": y }),
        )
    }

    pub fn stroke_start(seq: u64, stroke: &Stroke) -> Outbound {
        Outbound::new(
            "stroke_start",
            seq,
            json!({
                "strokeId": stroke.stroke_id,
                "userId": stroke.owner_id,
                "color": stroke.color,
                "width": stroke.width,
            }),
        )
    }

    pub fn stroke_add(seq: u64, user_id: &str, stroke_id: &str, points: &[Point]) -> Outbound {
        Outbound::new(
            "stroke_add",
            seq,
            json!({ "strokeId": stroke_id, "userId": user_id, "points": points }),
        )
    }

    pub fn stroke_end(seq: u64, user_id: &str, stroke_id: &str) -> Outbound {
        Outbound::new(
            "stroke_end",
            seq,
            json!({ "strokeId": stroke_id, "userId": user_id }),
        )
    }

    pub fn stroke_move(seq: u64, user_id: &str, stroke_id: &str, dx: f32, dy: f32) -> Outbound {
        Outbound::new(
            "stroke_move",
            seq,
            json!({ "strokeId": stroke_id, "userId": user_id, "dx": dx, "dy": dy }),
        )
    }

    /// Full board snapshot for a joiner: the most recent strokes in
    /// insertion order plus the room sequence at snapshot time.
    pub fn room_state(seq: u64, strokes: Vec<Value>, snapshot_seq: u64) -> Outbound {
        Outbound::new(
            "room_state",
            seq,
            json!({ "strokes": strokes, "snapshotSeq": snapshot_seq }),
        )
    }

    /// Heartbeat reply; echoes the seq the client sent.
    pub fn pong(client_seq: u64) -> Outbound {
        Outbound::new("pong", client_seq, json!({}))
    }

    /// Error frames carry seq 0: the only surfaced errors precede room
    /// membership, so there is no room counter to sample.
    pub fn error(code: ErrorCode) -> Outbound {
        Outbound::new(
            "error",
            0,
            json!({ "code": code.as_str(), "message": code.message() }),
        )
    }
}

/// Parse a serialized outbound frame back into [`Outbound`]. Servers do not
/// receive these; this exists for the codec round-trip law and tooling.
pub fn parse_outbound(text: &str) -> Result<Outbound, ParseError> {
    serde_json::from_str(text).map_err(|_| ParseError::Malformed)
}
