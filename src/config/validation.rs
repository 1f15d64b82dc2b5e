//! Configuration validation functions.

use super::Config;

/// Sanity-check a loaded configuration before the server starts listening.
///
/// There is little that can be wrong at the transport layer for this
/// service — mostly this guards against a config file typo producing a
/// degenerate server.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    if config.protocol.room_code_length == 0 {
        anyhow::bail!("protocol.room_code_length must be greater than zero");
    }

    if config.server.max_message_size == 0 {
        anyhow::bail!("server.max_message_size must be greater than zero");
    }

    if config.server.max_connections_per_ip == 0 {
        anyhow::bail!("server.max_connections_per_ip must be greater than zero");
    }

    if config
        .server
        .default_time_control
        .parse::<crate::protocol::TimeControl>()
        .is_err()
    {
        anyhow::bail!(
            "server.default_time_control `{}` is not a valid time control",
            config.server.default_time_control
        );
    }

    Ok(())
}

/// Detect if we're running in production mode.
///
/// Checks for `CHESS_SERVER__ENVIRONMENT` or generic `PRODUCTION` / `PROD`
/// environment variables.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("CHESS_SERVER__ENVIRONMENT") {
        return mode.eq_ignore_ascii_case("production") || mode.eq_ignore_ascii_case("prod");
    }

    env::var("CHESS_SERVER_PRODUCTION").is_ok()
        || env::var("PRODUCTION").is_ok()
        || env::var("PROD").is_ok()
}
