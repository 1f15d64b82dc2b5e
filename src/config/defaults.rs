//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's
//! `#[serde(default = ...)]` attributes throughout the configuration system.

use super::logging::LogFormat;

// =============================================================================
// Root / Transport
// =============================================================================

pub const fn default_port() -> u16 {
    8080
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

// =============================================================================
// Server defaults — the tunables named in spec.md §6
// =============================================================================

pub const fn default_ping_interval_ms() -> u64 {
    30_000
}

pub const fn default_disconnect_grace_ms() -> u64 {
    60_000
}

pub const fn default_room_ttl_after_end_ms() -> u64 {
    300_000
}

pub fn default_time_control() -> String {
    "5+0".to_string()
}

pub const fn default_room_cleanup_interval_secs() -> u64 {
    30
}

pub const fn default_max_rooms() -> usize {
    10_000
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Protocol defaults
// =============================================================================

pub const fn default_room_code_length() -> usize {
    6
}

pub const fn default_max_player_name_length() -> usize {
    32
}

// =============================================================================
// Logging defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
