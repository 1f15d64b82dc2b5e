//! Server behavior configuration: the tunables named in the wire protocol
//! (disconnect grace, room TTL, ping interval, default time control), plus
//! the transport-shape knobs every deployment of this server needs.

use super::defaults::{
    default_cors_origins, default_disconnect_grace_ms, default_max_connections_per_ip,
    default_max_message_size, default_max_rooms, default_ping_interval_ms,
    default_room_cleanup_interval_secs, default_room_ttl_after_end_ms, default_time_control,
};
use serde::{Deserialize, Serialize};

/// Server configuration for room lifecycle, transport limits, and the
/// session-liveness timers.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval between server-initiated `ping` frames (milliseconds).
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// How long a disconnected player's seat is held open for reconnection
    /// before the opponent is awarded the win (milliseconds).
    #[serde(default = "default_disconnect_grace_ms")]
    pub disconnect_grace_ms: u64,
    /// How long a finished room is kept addressable (for late reconnects,
    /// rematch offers) before it is torn down (milliseconds).
    #[serde(default = "default_room_ttl_after_end_ms")]
    pub room_ttl_after_end_ms: u64,
    /// Time control assumed when `create_room`/`quick_match` omits one.
    #[serde(default = "default_time_control")]
    pub default_time_control: String,
    /// Maximum message size accepted from a client connection, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum simultaneous connections accepted from a single IP address.
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Interval for the background sweep that expires stale disconnect
    /// grace periods and ended rooms past their TTL (seconds).
    #[serde(default = "default_room_cleanup_interval_secs")]
    pub room_cleanup_interval_secs: u64,
    /// Ceiling on the number of simultaneously live rooms.
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    /// Comma-separated list of allowed CORS origins, or `"*"` for any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            disconnect_grace_ms: default_disconnect_grace_ms(),
            room_ttl_after_end_ms: default_room_ttl_after_end_ms(),
            default_time_control: default_time_control(),
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
            room_cleanup_interval_secs: default_room_cleanup_interval_secs(),
            max_rooms: default_max_rooms(),
            cors_origins: default_cors_origins(),
        }
    }
}
