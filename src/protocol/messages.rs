//! Wire-level message types. Every frame is `{"type": "...", "payload": {...}}`;
//! serde's internally-tagged representation with `content = "payload"` gives us
//! that shape for free in both directions.

use serde::{Deserialize, Serialize};

use super::types::{ClockSnapshot, Color, RoomId, TimeControlTag};

/// Messages accepted from a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Must be the first frame on a connection; binds it to a session id.
    Auth { session_id: String },
    /// Create a new room and wait for an opponent.
    CreateRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        time_control: Option<TimeControlTag>,
    },
    /// Join an existing room by its code.
    JoinRoom {
        room_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Enter the matchmaking queue for a time-control tag.
    QuickMatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        time_control: Option<TimeControlTag>,
    },
    /// Leave the matchmaking queue.
    CancelQueue,
    /// Play a move, given in SAN.
    Move { san: String },
    /// Resign the current game.
    Resign,
    /// Offer a draw to the opponent.
    DrawOffer,
    /// Respond to a pending draw offer.
    DrawRespond { accept: bool },
    /// Offer a rematch after the game has finished.
    RematchOffer,
    /// Respond to a pending rematch offer.
    RematchRespond { accept: bool },
}

/// Messages sent to a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges a successful `auth`.
    AuthOk,
    /// A room was created and is waiting for an opponent.
    RoomCreated { room_id: RoomId, color: Color },
    /// The room now has two players and play has started.
    GameStart {
        room_id: RoomId,
        color: Color,
        fen: String,
        time_control: String,
        opponent_name: String,
    },
    /// A rematch has started; shape matches `game_start`.
    RematchStart {
        room_id: RoomId,
        color: Color,
        fen: String,
        time_control: String,
        opponent_name: String,
    },
    /// A move made by the opponent.
    Move {
        san: String,
        fen: String,
        clocks: Option<ClockSnapshot>,
    },
    /// Acknowledgement of the mover's own move.
    MoveAck { clocks: Option<ClockSnapshot> },
    /// The game has ended.
    GameEnd { result: String, reason: String },
    /// The opponent has offered a draw.
    DrawOffered,
    /// The opponent declined a draw offer.
    DrawDeclined,
    /// The opponent has offered a rematch.
    RematchOffered,
    /// The opponent declined a rematch offer.
    RematchDeclined,
    /// The opponent's connection has dropped; the grace window in seconds.
    OpponentDisconnected { timeout: u64 },
    /// The opponent has reconnected.
    OpponentReconnected,
    /// Sent to a reconnecting client with everything needed to resume play.
    Reconnect {
        room_id: RoomId,
        color: Color,
        fen: String,
        time_control: String,
        moves: Vec<String>,
        clocks: Option<ClockSnapshot>,
        opponent_name: String,
        opponent_connected: bool,
    },
    /// Acknowledges entry into the matchmaking queue.
    QueueJoined { time_control: String, position: usize },
    /// Acknowledges leaving the matchmaking queue.
    QueueLeft,
    /// A protocol or domain error.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_auth_round_trips() {
        let json = r#"{"type":"auth","payload":{"sessionId":"abc"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { session_id } if session_id == "abc"));
    }

    #[test]
    fn client_message_move_round_trips() {
        let json = r#"{"type":"move","payload":{"san":"e4"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Move { san } if san == "e4"));
    }

    #[test]
    fn server_error_serializes_to_message_only() {
        let msg = ServerMessage::error("Not your turn");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["message"], "Not your turn");
    }

    #[test]
    fn room_created_carries_color_as_single_letter_and_camel_case_fields() {
        let msg = ServerMessage::RoomCreated {
            room_id: RoomId("ABC234".to_string()),
            color: Color::White,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["color"], "w");
        assert_eq!(json["payload"]["roomId"], "ABC234");
    }

    #[test]
    fn unknown_client_message_type_fails_to_parse() {
        let json = r#"{"type":"teleport","payload":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }
}
