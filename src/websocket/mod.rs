//! Transport (§4.1): the WebSocket handler and the per-connection read/write
//! loops that turn a socket into a stream of [`crate::protocol::ClientMessage`]
//! and [`crate::protocol::ServerMessage`] frames for [`crate::server::GameServer`].
//!
//! - [`handler`]: the `/ws` upgrade endpoint (entry point)
//! - [`connection`]: per-connection read/write tasks, handshake gate, liveness
//! - [`routes`]: the Axum router (`/ws`, `/health`, `/metrics`)

mod connection;
mod handler;
mod metrics;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use routes::{create_router, run_server};
