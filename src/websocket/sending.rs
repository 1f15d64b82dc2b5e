//! Frame serialization. Every outbound frame is a single JSON text message
//! of shape `{"type":"...","payload":{...}}` (§6); there is no binary
//! channel in this protocol.

use axum::extract::ws::Message;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use axum::extract::ws::WebSocket;

use crate::protocol::{SessionId, ServerMessage};

/// Serialize and write a single frame. A write failure means the peer is
/// gone; the caller treats that as "stop the send loop", not a panic.
pub(super) async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    session_id: Option<&SessionId>,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(?session_id, error = %err, "failed to serialize server message");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
