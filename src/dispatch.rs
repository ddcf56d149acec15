//! Per-frame message routing. One entry point takes a raw text frame and a
//! connection, parses and validates, and hands off to the registry, board,
//! or presence subsystem.
//!
//! Error policy (observable effects):
//! - surfaced as `error` frames: malformed envelope, unknown type, join
//!   failures.
//! - silently dropped: bad fields on drawing/cursor frames from a joined
//!   client, rate-limited cursor updates, stroke ownership/state
//!   violations. Logged server-side only; never answered on the wire.

use crate::board;
use crate::presence;
use crate::protocol::{outbound, parse_frame, ClientCommand, ErrorCode, ParseError};
use crate::registry::RoomRegistry;
use crate::room::SessionHandle;

/// Room membership of one connection, set by a successful join.
#[derive(Debug, Clone)]
pub struct Membership {
    pub room_id: String,
    pub user_id: String,
}

/// Dispatcher-side view of one WebSocket connection.
pub struct Connection {
    pub handle: SessionHandle,
    pub membership: Option<Membership>,
}

impl Connection {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            membership: None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.user_id.as_str())
    }
}

/// Route one inbound text frame.
pub fn dispatch(registry: &RoomRegistry, conn: &mut Connection, raw: &str) {
    let frame = match parse_frame(raw) {
        Ok(frame) => frame,
        Err(err) => return on_parse_error(conn, err),
    };

    match frame.command {
        ClientCommand::Ping => {
            conn.handle.try_send(&outbound::pong(frame.seq).to_text());
            return;
        }
        ClientCommand::JoinRoom {
            room_id,
            user_name,
            password,
        } => {
            return on_join(registry, conn, &room_id, &user_name, password.as_deref());
        }
        _ => {}
    }

    // Everything else requires membership; pre-join frames are dropped.
    let Some(membership) = conn.membership.clone() else {
        return;
    };
    let Some(room) = registry.get(&membership.room_id) else {
        return;
    };
    let uid = membership.user_id.as_str();

    let result = match frame.command {
        ClientCommand::CursorMove { x, y } => {
            presence::cursor_move(&room, registry.limiter(), uid, x, y)
        }
        ClientCommand::StrokeStart {
            stroke_id,
            color,
            width,
        } => {
            board::stroke_start(&room, uid, &stroke_id, &color, width);
            Ok(())
        }
        ClientCommand::StrokeAdd { stroke_id, points } => {
            board::stroke_add(&room, uid, &stroke_id, &points)
        }
        ClientCommand::StrokeEnd { stroke_id } => board::stroke_end(&room, uid, &stroke_id),
        ClientCommand::StrokeMove { stroke_id, dx, dy } => {
            board::stroke_move(&room, uid, &stroke_id, dx, dy)
        }
        ClientCommand::Ping | ClientCommand::JoinRoom { .. } => Ok(()),
    };

    if let Err(code) = result {
        // Rate-limited cursors are routine under burst; don't log those.
        if code != ErrorCode::RateLimited {
            eprintln!(
                "⚠️  Dropped frame from {uid} in {}: {}",
                membership.room_id,
                code.as_str()
            );
        }
    }
}

fn on_join(
    registry: &RoomRegistry,
    conn: &mut Connection,
    room_id: &str,
    user_name: &str,
    password: Option<&str>,
) {
    if conn.membership.is_some() {
        send_error(&conn.handle, ErrorCode::AlreadyInRoom);
        return;
    }

    // Field validation is shape-only; any string roomId/userName is accepted.
    match registry.join(room_id, user_name, password, conn.handle.clone()) {
        Ok(outcome) => {
            conn.membership = Some(Membership {
                room_id: room_id.to_string(),
                user_id: outcome.user_id,
            });
        }
        Err(code) => send_error(&conn.handle, code),
    }
}

fn on_parse_error(conn: &Connection, err: ParseError) {
    match err {
        ParseError::Malformed => send_error(&conn.handle, ErrorCode::MalformedMessage),
        ParseError::UnknownType => send_error(&conn.handle, ErrorCode::InvalidMessageType),
        ParseError::MissingField { kind, field } | ParseError::InvalidField { kind, field } => {
            if kind == "join_room" {
                send_error(&conn.handle, err.code());
            } else {
                eprintln!("⚠️  Dropped {kind} frame with bad field `{field}`");
            }
        }
    }
}

fn send_error(handle: &SessionHandle, code: ErrorCode) {
    handle.try_send(&outbound::error(code).to_text());
}
