#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Chess Room Server
//!
//! A server-authoritative multiplayer chess server: two clients per room,
//! SAN moves validated and played server-side, Fischer clocks, draw and
//! rematch offers, and reconnect-with-grace-period handling over a single
//! JSON WebSocket protocol.

/// Server configuration and environment variables.
pub mod config;

/// Structured logging configuration.
pub mod logging;

/// Historical-game persistence interface.
pub mod persistence;

/// Wire message protocol definitions.
pub mod protocol;

/// Chess rule engine adapter.
pub mod rules;

/// Room state machine, matchmaker, and connection/session orchestration.
pub mod server;

/// WebSocket connection handling.
pub mod websocket;
