//! One WebSocket connection: the read loop, the serialized write queue, and
//! the heartbeat timeout.
//!
//! A single task owns both halves of the socket. Reads and outbox drains are
//! multiplexed with `select!`; because only this loop drains the outbox and
//! each write is awaited to completion, delivery to this peer is FIFO with
//! at most one write in flight. Everything else in the process talks to the
//! session through its [`SessionHandle`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use rocket::futures::{SinkExt, StreamExt};
use rocket_ws as ws;

use crate::dispatch::{self, Connection};
use crate::limits::HEARTBEAT_TIMEOUT_MS;
use crate::registry::RoomRegistry;
use crate::room::SessionHandle;

/// How often the loop wakes to check the heartbeat deadline.
const HEARTBEAT_CHECK_SECS: u64 = 5;

pub async fn run(
    stream: ws::stream::DuplexStream,
    registry: Arc<RoomRegistry>,
) -> ws::result::Result<()> {
    let (mut sink, mut reader) = stream.split();
    let (handle, mut outbox) = SessionHandle::channel();
    let mut conn = Connection::new(handle);

    let timeout = Duration::from_millis(HEARTBEAT_TIMEOUT_MS);
    let mut last_frame = Instant::now();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_CHECK_SECS));

    loop {
        tokio::select! {
            frame = reader.next() => {
                match frame {
                    Some(Ok(ws::Message::Text(text))) => {
                        last_frame = Instant::now();
                        dispatch::dispatch(&registry, &mut conn, &text);
                    }
                    // Any frame counts as liveness. Binary frames carry no
                    // protocol meaning and are otherwise ignored.
                    Some(Ok(ws::Message::Ping(_)))
                    | Some(Ok(ws::Message::Pong(_)))
                    | Some(Ok(ws::Message::Binary(_))) => {
                        last_frame = Instant::now();
                    }
                    Some(Ok(ws::Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            queued = outbox.recv() => {
                match queued {
                    Some(text) => {
                        if sink.send(ws::Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Unreachable while `conn` holds a sender; treated as close.
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if last_frame.elapsed() >= timeout {
                    if let Some(user) = conn.user_id() {
                        eprintln!("💤 Heartbeat timeout for {user}; closing session");
                    }
                    break;
                }
            }
        }
    }

    // Leave releases membership whether the close was graceful or not.
    if let Some(membership) = conn.membership.take() {
        registry.leave(&membership.room_id, &membership.user_id);
        println!(
            "🔌 {} disconnected from {}",
            membership.user_id, membership.room_id
        );
    }

    let _ = sink.close().await;
    Ok(())
}
