use std::env;

// Protocol constants. These are part of the wire contract and are not
// configurable: clients size their buffers and retry logic around them.

/// Maximum members in one room. The 16th join is rejected with ROOM_FULL.
pub const MAX_USERS_PER_ROOM: usize = 15;

/// Stroke history bound per room. Inserting past the limit evicts from the
/// front (insertion-order FIFO).
pub const MAX_STROKES_PER_ROOM: usize = 1000;

/// Number of most-recent strokes included in a `room_state` snapshot.
pub const SNAPSHOT_STROKE_LIMIT: usize = 500;

/// Largest accepted WebSocket text frame, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65536;

/// Point-count bound per stroke. `stroke_add` pushing past this fails.
pub const MAX_POINTS_PER_STROKE: usize = 10000;

/// Expected client ping cadence.
pub const HEARTBEAT_INTERVAL_MS: u64 = 10000;

/// A session that receives no frame for this long is closed.
pub const HEARTBEAT_TIMEOUT_MS: u64 = 30000;

/// Members whose last activity is older than this are considered ghosts.
pub const GHOST_CURSOR_TIMEOUT_MS: u64 = 3000;

/// Mute duration applied after repeated cursor rate-limit violations.
pub const RATE_LIMIT_MUTE_DURATION_MS: u64 = 10000;

/// Consecutive rejected cursor updates before the mute kicks in.
pub const RATE_LIMIT_MUTE_AFTER: u32 = 3;

/// Cursor token bucket: steady refill rate (tokens per second).
pub const CURSOR_UPDATES_PER_SECOND: f64 = 20.0;

/// Cursor token bucket: burst capacity.
pub const RATE_LIMIT_BURST_SIZE: f64 = 5.0;

/// Seconds an empty room survives before deletion (join cancels the timer).
pub const ROOM_GRACE_PERIOD_SECS: u64 = 60;

/// Bounded depth of each session's write queue. A peer whose queue is full
/// has further broadcasts dropped rather than blocking the room.
pub const SESSION_OUTBOX_DEPTH: usize = 256;

/// Fixed 15-entry color palette. Colors are assigned by a process-wide
/// rotating index and cycle rather than being reclaimed on leave.
pub const COLOR_PALETTE: [&str; 15] = [
    "#FF5733", "#33FF57", "#3357FF", "#FF33F5", "#F5FF33", "#33FFF5",
    "#FF8C33", "#8C33FF", "#33FF8C", "#FF338C", "#338CFF", "#8CFF33",
    "#FF3333", "#33FF33", "#3333FF",
];

/// Operational knobs read from environment variables with defaults.
///
/// Environment variables:
/// - `ROOM_GRACE_SECS` — Seconds an empty room is preserved (default: 60)
/// - `CURSOR_RATE_LIMIT` — Cursor updates per second per user (default: 20)
/// - `CURSOR_BURST` — Cursor bucket burst size (default: 5)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub room_grace_secs: u64,
    pub cursor_rate: f64,
    pub cursor_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_grace_secs: ROOM_GRACE_PERIOD_SECS,
            cursor_rate: CURSOR_UPDATES_PER_SECOND,
            cursor_burst: RATE_LIMIT_BURST_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables, with defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("ROOM_GRACE_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.room_grace_secs = n;
        }
        if let Ok(val) = env::var("CURSOR_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.cursor_rate = n;
        }
        if let Ok(val) = env::var("CURSOR_BURST")
            && let Ok(n) = val.parse::<f64>()
        {
            config.cursor_burst = n;
        }

        config
    }
}
