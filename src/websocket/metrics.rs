//! `/metrics` — Prometheus text-format exposition of [`crate::server::ServerMetrics`].
//! No bearer-token gate: HTTP auth is out of scope for this service, and
//! `/metrics` is treated the same as `/health` — unauthenticated, process-local.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::server::GameServer;

pub async fn metrics_handler(State(server): State<Arc<GameServer>>) -> Response {
    let body = server.render_prometheus_metrics();
    let headers = [(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    )];
    (headers, body).into_response()
}
