//! Protocol-shape configuration: limits enforced on wire-level identifiers.

use super::defaults::{default_max_player_name_length, default_room_code_length};
use serde::{Deserialize, Serialize};

/// Protocol configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Length of generated room codes.
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Maximum length accepted for a player display name.
    #[serde(default = "default_max_player_name_length")]
    pub max_player_name_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            room_code_length: default_room_code_length(),
            max_player_name_length: default_max_player_name_length(),
        }
    }
}
