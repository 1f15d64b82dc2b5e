//! Room code generation: six characters drawn from an alphabet with
//! visually ambiguous characters removed (no `0`/`O`/`I`/`1`).

use crate::config::ProtocolConfig;
use rand::RngExt;

const CLEAN_CHARS: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Generate a room code of the length configured in `ProtocolConfig`.
pub fn generate_room_code_with_config(config: &ProtocolConfig) -> String {
    generate_room_code_of_length(config.room_code_length)
}

/// Generate a room code of the given length. Panics are impossible: an
/// empty string is returned for length zero.
pub fn generate_room_code_of_length(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CLEAN_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CLEAN_CHARS[idx] as char;
            ch
        })
        .collect()
}
