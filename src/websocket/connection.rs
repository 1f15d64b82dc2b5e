//! Per-connection lifecycle (§4.1): the handshake gate, the liveness probe,
//! and the read/write loops that turn a raw `WebSocket` into
//! [`crate::protocol::ClientMessage`]/[`crate::protocol::ServerMessage`]
//! frames for [`GameServer`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage, SessionId};
use crate::server::{ConnectionId, GameServer, PingTracker, RegisterConnectionError};

use super::sending::send_message;

const FIRST_FRAME_ERROR: &str = "First message must be auth with sessionId";

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<GameServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let direct_tx = tx.clone();

    let connection_id = match server.register_connection(addr.ip(), tx) {
        Ok(id) => id,
        Err(RegisterConnectionError::IpLimitExceeded { current, limit }) => {
            let msg = ServerMessage::error(format!(
                "Too many connections from your address ({current}/{limit})"
            ));
            let _ = send_message(&mut sender, &msg, None).await;
            let _ = sender.close().await;
            return;
        }
    };

    let ping_interval = Duration::from_millis(server.config().server.ping_interval_ms);
    let ping_tracker = Arc::new(PingTracker::new());
    let ping_tracker_for_writer = Arc::clone(&ping_tracker);

    // Single task owns the socket's write half: ordinary `ServerMessage`
    // frames and the liveness-probe `Ping` frame both flow through here, so
    // there is never a race between the two over who writes next.
    let write_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Some(message) => {
                            if send_message(&mut sender, &message, None).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if ping_tracker_for_writer.is_stale(ping_interval) {
                        break;
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut session: Option<SessionId> = None;

    while let Some(frame) = receiver.next().await {
        let Ok(frame) = frame else { break };
        match frame {
            Message::Close(_) => break,
            Message::Pong(_) => {
                ping_tracker.record_pong();
            }
            Message::Ping(_) => {}
            Message::Text(text) => {
                if text.len() > server.config().server.max_message_size {
                    let _ = direct_tx.send(ServerMessage::error("Message too large"));
                    continue;
                }
                handle_text_frame(&server, connection_id, &direct_tx, &mut session, &text).await;
            }
            Message::Binary(_) => {
                let _ = direct_tx.send(ServerMessage::error("Binary frames are not supported"));
            }
        }
    }

    write_task.abort();
    server.handle_connection_closed(connection_id).await;
}

/// Decodes one text frame and either completes the handshake (if no session
/// is bound yet) or routes it to [`GameServer::handle_client_message`].
/// `direct_tx` lets this connection answer a bad first frame immediately,
/// before any session is registered to address it by.
async fn handle_text_frame(
    server: &Arc<GameServer>,
    connection_id: ConnectionId,
    direct_tx: &mpsc::UnboundedSender<ServerMessage>,
    session: &mut Option<SessionId>,
    text: &str,
) {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);

    if session.is_none() {
        match parsed {
            Ok(ClientMessage::Auth { session_id }) if !session_id.trim().is_empty() => {
                let sid = SessionId(session_id);
                *session = Some(sid.clone());
                server.handle_auth(connection_id, sid).await;
            }
            _ => {
                let _ = direct_tx.send(ServerMessage::error(FIRST_FRAME_ERROR));
            }
        }
        return;
    }

    match parsed {
        Ok(message) => {
            let session_id = session.clone().expect("session bound above");
            server.handle_client_message(session_id, message).await;
        }
        Err(err) => {
            let _ = direct_tx.send(ServerMessage::error(format!("Invalid message: {err}")));
        }
    }
}
