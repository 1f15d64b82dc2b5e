//! Axum router wiring and the process entry point for serving the protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::server::GameServer;

use super::handler::websocket_handler;
use super::metrics::metrics_handler;

/// Build the router: `/ws` for the protocol, `/health` for liveness probes,
/// `/metrics` for a Prometheus-text scrape.
pub fn create_router(cors_origins: &str) -> Router<Arc<GameServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

/// Bind a listener and serve the protocol, spawning the room maintenance
/// sweep alongside it.
pub async fn run_server(
    addr: SocketAddr,
    server: Arc<GameServer>,
    cors_origins: String,
) -> anyhow::Result<()> {
    tokio::spawn(Arc::clone(&server).run_maintenance_loop());

    let app = create_router(&cors_origins).with_state(server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "chess room server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
