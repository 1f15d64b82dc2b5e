//! Dispatches a post-handshake [`ClientMessage`] to the matching handler.
//! `auth` is handled separately by the WebSocket connection loop — by the
//! time a message reaches here, the sending session is already known.

use std::sync::Arc;

use crate::protocol::{ClientMessage, SessionId};

use super::GameServer;

impl GameServer {
    pub async fn handle_client_message(self: &Arc<Self>, session: SessionId, message: ClientMessage) {
        match message {
            ClientMessage::Auth { .. } => {
                tracing::warn!(%session, "received auth after handshake; ignoring");
            }
            ClientMessage::CreateRoom { name, time_control } => {
                self.create_room(session, name, time_control).await;
            }
            ClientMessage::JoinRoom { room_id, name } => {
                self.join_room(session, room_id, name).await;
            }
            ClientMessage::QuickMatch { name, time_control } => {
                self.quick_match(session, name, time_control).await;
            }
            ClientMessage::CancelQueue => {
                self.cancel_queue(session).await;
            }
            ClientMessage::Move { san } => {
                self.make_move(session, san).await;
            }
            ClientMessage::Resign => {
                self.resign(session).await;
            }
            ClientMessage::DrawOffer => {
                self.draw_offer(session).await;
            }
            ClientMessage::DrawRespond { accept } => {
                self.draw_respond(session, accept).await;
            }
            ClientMessage::RematchOffer => {
                self.rematch_offer(session).await;
            }
            ClientMessage::RematchRespond { accept } => {
                self.rematch_respond(session, accept).await;
            }
        }
    }
}
