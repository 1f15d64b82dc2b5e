//! Handles the `auth` handshake frame: binds a connection to its session
//! and, if that session is already seated in a room, runs the reconnect
//! protocol (§4.6.4) instead of leaving the player stranded.

use std::sync::Arc;

use crate::protocol::{ServerMessage, SessionId};

use super::room::RoomStatus;
use super::session_registry::ConnectionId;
use super::{now_ms, GameServer};

impl GameServer {
    /// Binds `session_id` to `connection_id`, answers with `auth_ok`, and
    /// replays room state if the session was already seated somewhere.
    pub async fn handle_auth(self: &Arc<Self>, connection_id: ConnectionId, session_id: SessionId) {
        self.registry.bind_session(connection_id, session_id.clone());
        self.send(&session_id, ServerMessage::AuthOk).await;

        let Some(room_id) = self.registry.room_of(&session_id) else {
            return;
        };
        let Some(entry) = self.rooms.get(&room_id) else {
            self.registry.clear_session_room(&session_id);
            return;
        };
        let handle = Arc::clone(entry.value());
        drop(entry);

        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session_id) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }

        let was_disconnected = room
            .slot(color)
            .is_some_and(|slot| !slot.connected);
        if was_disconnected {
            room.mark_reconnected(color);
            super::timers::disarm(&mut room.disconnect_timer);
        }

        let opponent_color = color.opposite();
        let opponent_session = room.slot(opponent_color).map(|s| s.session_id.clone());
        let opponent_name = room
            .slot(opponent_color)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let opponent_connected = room.slot(opponent_color).is_some_and(|s| s.connected);

        let clocks = room.live_clocks(now_ms());
        let moves = room.moves.iter().map(|m| m.san.clone()).collect();
        let fen = room.rules.fen();
        let tc_str = room.time_control.to_string();
        let still_playing = room.status == RoomStatus::Playing;
        drop(room);

        self.send(
            &session_id,
            ServerMessage::Reconnect {
                room_id,
                color,
                fen,
                time_control: tc_str,
                moves,
                clocks,
                opponent_name,
                opponent_connected,
            },
        )
        .await;

        if was_disconnected && still_playing {
            if let Some(opponent_session) = opponent_session {
                self.send(&opponent_session, ServerMessage::OpponentReconnected).await;
            }
        }
    }
}
