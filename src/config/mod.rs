//! Configuration module for the chess room server.
//!
//! Supports JSON configuration files, environment variable overrides, stdin
//! input, and sensible defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Room lifecycle and transport tunables
//! - [`protocol`]: Wire-identifier limits (room code length, name length)
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use protocol::ProtocolConfig;
pub use server::ServerConfig;
pub use types::Config;
pub use validation::{is_production_mode, validate_config_security};
