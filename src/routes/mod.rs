// Route module decomposition — system endpoints, the room directory, and
// the WebSocket upgrade.

mod rooms;
mod system;
mod ws;

pub use rooms::{get_room, list_rooms};
pub use system::{health, stats};
pub use ws::whiteboard_ws;
