use std::sync::Arc;

use rocket::{get, State};
use rocket_ws as ws;

use crate::limits::MAX_MESSAGE_SIZE;
use crate::registry::RoomRegistry;
use crate::session;

/// Upgrade to WebSocket and hand the duplex stream to the session loop.
/// Frames beyond `MAX_MESSAGE_SIZE` are rejected by the protocol layer.
#[get("/ws")]
pub fn whiteboard_ws(
    socket: ws::WebSocket,
    registry: &State<Arc<RoomRegistry>>,
) -> ws::Channel<'static> {
    let registry = registry.inner().clone();

    let mut config = ws::Config::default();
    config.max_message_size = Some(MAX_MESSAGE_SIZE);
    let socket = socket.config(config);

    socket.channel(move |stream| Box::pin(session::run(stream, registry)))
}
