//! Black-box WebSocket integration tests against an in-process `axum::serve`
//! instance, exercising the boundary scenarios of the live session protocol:
//! handshake gate, room creation/joining, the move pipeline, resignation,
//! draw/rematch offers, disconnect/reconnect, abandonment, and matchmaker
//! pairing. Mirrors the teacher's `tests/e2e_tests.rs` shape (real sockets,
//! `tokio_tungstenite` client, helper send/recv functions).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chess_room_server::config::Config;
use chess_room_server::persistence::InMemoryGameStore;
use chess_room_server::protocol::{ClientMessage, ServerMessage};
use chess_room_server::server::GameServer;
use chess_room_server::websocket::create_router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsConn = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsConn, Message>;
type WsStream = SplitStream<WsConn>;

async fn start_test_server(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = GameServer::new(Arc::new(config), Arc::new(InMemoryGameStore::new()));
    let router = create_router("*").with_state(server);

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("server exited");
    });

    // give the listener a moment to actually accept.
    tokio::time::sleep(Duration::from_millis(30)).await;
    addr
}

/// A disconnect-grace/room-TTL configuration short enough to exercise in a
/// test without a multi-second sleep.
fn fast_timers_config() -> Config {
    let mut config = Config::default();
    config.server.disconnect_grace_ms = 150;
    config.server.room_ttl_after_end_ms = 200;
    config.server.room_cleanup_interval_secs = 1;
    config
}

async fn connect(addr: SocketAddr) -> (WsSink, WsStream) {
    let url = format!("ws://{addr}/ws");
    let (ws, _) = connect_async(&url).await.expect("client connect");
    ws.split()
}

async fn send(sink: &mut WsSink, message: ClientMessage) {
    let json = serde_json::to_string(&message).expect("serialize client message");
    sink.send(Message::Text(json.into())).await.expect("send frame");
}

async fn send_raw(sink: &mut WsSink, raw: &str) {
    sink.send(Message::Text(raw.to_string().into()))
        .await
        .expect("send raw frame");
}

async fn recv(stream: &mut WsStream) -> ServerMessage {
    let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for a server message")
        .expect("connection closed before a message arrived")
        .expect("websocket protocol error");
    match frame {
        Message::Text(text) => {
            serde_json::from_str(&text).unwrap_or_else(|e| panic!("invalid ServerMessage json `{text}`: {e}"))
        }
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn auth(sink: &mut WsSink, stream: &mut WsStream, session_id: &str) {
    send(
        sink,
        ClientMessage::Auth {
            session_id: session_id.to_string(),
        },
    )
    .await;
    let msg = recv(stream).await;
    assert!(matches!(msg, ServerMessage::AuthOk), "expected auth_ok, got {msg:?}");
}

#[tokio::test]
async fn handshake_gate_rejects_non_auth_first_frame() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink, mut stream) = connect(addr).await;

    send_raw(&mut sink, r#"{"type":"move","payload":{"san":"e4"}}"#).await;

    let msg = recv(&mut stream).await;
    match msg {
        ServerMessage::Error { message } => {
            assert_eq!(message, "First message must be auth with sessionId");
        }
        other => panic!("expected an error frame, got {other:?}"),
    }
}

#[tokio::test]
async fn happy_path_create_join_and_first_move() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;

    auth(&mut sink_a, &mut stream_a, "session-a").await;
    auth(&mut sink_b, &mut stream_b, "session-b").await;

    send(
        &mut sink_a,
        ClientMessage::CreateRoom {
            name: Some("Alice".to_string()),
            time_control: Some("1+0".parse().unwrap()),
        },
    )
    .await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, color } => {
            assert_eq!(color, chess_room_server::protocol::Color::White);
            room_id
        }
        other => panic!("expected room_created, got {other:?}"),
    };

    send(
        &mut sink_b,
        ClientMessage::JoinRoom {
            room_id: room_id.0.clone(),
            name: Some("Bob".to_string()),
        },
    )
    .await;

    let start_a = recv(&mut stream_a).await;
    let start_b = recv(&mut stream_b).await;
    match (start_a, start_b) {
        (
            ServerMessage::GameStart {
                color: color_a,
                opponent_name: opp_a,
                ..
            },
            ServerMessage::GameStart {
                color: color_b,
                opponent_name: opp_b,
                ..
            },
        ) => {
            assert_eq!(color_a, chess_room_server::protocol::Color::White);
            assert_eq!(color_b, chess_room_server::protocol::Color::Black);
            assert_eq!(opp_a, "Bob");
            assert_eq!(opp_b, "Alice");
        }
        other => panic!("expected two game_start frames, got {other:?}"),
    }

    send(&mut sink_a, ClientMessage::Move { san: "e4".to_string() }).await;

    let move_to_b = recv(&mut stream_b).await;
    match move_to_b {
        ServerMessage::Move { san, fen, clocks } => {
            assert_eq!(san, "e4");
            assert!(fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
            let clocks = clocks.expect("clocked game carries clocks");
            assert_eq!(clocks.w, 60_000);
            assert_eq!(clocks.b, 60_000);
        }
        other => panic!("expected move frame, got {other:?}"),
    }

    let ack = recv(&mut stream_a).await;
    match ack {
        ServerMessage::MoveAck { clocks } => {
            let clocks = clocks.expect("clocked game carries clocks");
            assert_eq!(clocks.w, 60_000);
            assert_eq!(clocks.b, 60_000);
        }
        other => panic!("expected move_ack, got {other:?}"),
    }
}

#[tokio::test]
async fn second_create_room_from_seated_session_is_rejected() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "session-dup").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: None }).await;
    let first = recv(&mut stream_a).await;
    assert!(matches!(first, ServerMessage::RoomCreated { .. }));

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: None }).await;
    let second = recv(&mut stream_a).await;
    match second {
        ServerMessage::Error { message } => assert_eq!(message, "You are already in this room"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn joining_unknown_room_is_rejected() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink, mut stream) = connect(addr).await;
    auth(&mut sink, &mut stream, "session-lonely").await;

    send(
        &mut sink,
        ClientMessage::JoinRoom {
            room_id: "ZZZZZZ".to_string(),
            name: None,
        },
    )
    .await;
    match recv(&mut stream).await {
        ServerMessage::Error { message } => assert_eq!(message, "Room not found"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn move_attempt_out_of_turn_is_rejected() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "turn-a").await;
    auth(&mut sink_b, &mut stream_b, "turn-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    // Black tries to move first.
    send(&mut sink_b, ClientMessage::Move { san: "e5".to_string() }).await;
    match recv(&mut stream_b).await {
        ServerMessage::Error { message } => assert_eq!(message, "Not your turn"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_san_is_rejected_without_state_change() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "inv-a").await;
    auth(&mut sink_b, &mut stream_b, "inv-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    send(&mut sink_a, ClientMessage::Move { san: "Qh5".to_string() }).await;
    match recv(&mut stream_a).await {
        ServerMessage::Error { message } => assert_eq!(message, "Invalid move"),
        other => panic!("expected error, got {other:?}"),
    }

    // The position is untouched: the legal opening move still succeeds.
    send(&mut sink_a, ClientMessage::Move { san: "e4".to_string() }).await;
    let relayed = recv(&mut stream_b).await;
    assert!(matches!(relayed, ServerMessage::Move { .. }));
}

#[tokio::test]
async fn clock_exhaustion_ends_the_game_as_timeout() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "flag-a").await;
    auth(&mut sink_b, &mut stream_b, "flag-b").await;

    // A "0+0" clock starts at zero; white's opening move carries no
    // deduction (first move of the game), but black's reply is not the
    // first move, so any nonzero elapsed time immediately flags black.
    send(
        &mut sink_a,
        ClientMessage::CreateRoom {
            name: None,
            time_control: Some("0+0".parse().unwrap()),
        },
    )
    .await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    send(&mut sink_a, ClientMessage::Move { san: "e4".to_string() }).await;
    recv(&mut stream_b).await; // move relay
    recv(&mut stream_a).await; // move_ack

    tokio::time::sleep(Duration::from_millis(5)).await;
    send(&mut sink_b, ClientMessage::Move { san: "e5".to_string() }).await;

    let end_b = recv(&mut stream_b).await;
    let end_a = recv(&mut stream_a).await;
    for end in [end_a, end_b] {
        match end {
            ServerMessage::GameEnd { result, reason } => {
                assert_eq!(result, "1-0");
                assert_eq!(reason, "timeout");
            }
            other => panic!("expected game_end, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn resignation_ends_the_game() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "res-a").await;
    auth(&mut sink_b, &mut stream_b, "res-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    send(&mut sink_a, ClientMessage::Resign).await;
    let end_a = recv(&mut stream_a).await;
    let end_b = recv(&mut stream_b).await;
    for end in [end_a, end_b] {
        match end {
            ServerMessage::GameEnd { result, reason } => {
                assert_eq!(result, "0-1");
                assert_eq!(reason, "resignation");
            }
            other => panic!("expected game_end, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn draw_offer_can_be_declined_then_accepted() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "draw-a").await;
    auth(&mut sink_b, &mut stream_b, "draw-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    send(&mut sink_a, ClientMessage::DrawOffer).await;
    assert!(matches!(recv(&mut stream_b).await, ServerMessage::DrawOffered));

    send(&mut sink_b, ClientMessage::DrawRespond { accept: false }).await;
    assert!(matches!(recv(&mut stream_a).await, ServerMessage::DrawDeclined));

    send(&mut sink_a, ClientMessage::DrawOffer).await;
    assert!(matches!(recv(&mut stream_b).await, ServerMessage::DrawOffered));
    send(&mut sink_b, ClientMessage::DrawRespond { accept: true }).await;

    let end_a = recv(&mut stream_a).await;
    let end_b = recv(&mut stream_b).await;
    for end in [end_a, end_b] {
        match end {
            ServerMessage::GameEnd { result, reason } => {
                assert_eq!(result, "1/2-1/2");
                assert_eq!(reason, "agreement");
            }
            other => panic!("expected game_end, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn rematch_swaps_colours() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "rematch-a").await;
    auth(&mut sink_b, &mut stream_b, "rematch-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await; // game_start for A (white)
    recv(&mut stream_b).await; // game_start for B (black)

    send(&mut sink_a, ClientMessage::Resign).await;
    recv(&mut stream_a).await; // game_end
    recv(&mut stream_b).await; // game_end

    send(&mut sink_b, ClientMessage::RematchOffer).await;
    assert!(matches!(recv(&mut stream_a).await, ServerMessage::RematchOffered));

    send(&mut sink_a, ClientMessage::RematchRespond { accept: true }).await;
    let start_a = recv(&mut stream_a).await;
    let start_b = recv(&mut stream_b).await;
    match (start_a, start_b) {
        (
            ServerMessage::RematchStart { color: color_a, .. },
            ServerMessage::RematchStart { color: color_b, .. },
        ) => {
            // A was white in game one; colours swap for the rematch.
            assert_eq!(color_a, chess_room_server::protocol::Color::Black);
            assert_eq!(color_b, chess_room_server::protocol::Color::White);
        }
        other => panic!("expected two rematch_start frames, got {other:?}"),
    }
}

#[tokio::test]
async fn reconnect_replays_room_state_and_notifies_opponent() {
    let addr = start_test_server(fast_timers_config()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "recon-a").await;
    auth(&mut sink_b, &mut stream_b, "recon-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0.clone(), name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    send(&mut sink_a, ClientMessage::Move { san: "e4".to_string() }).await;
    recv(&mut stream_b).await;
    recv(&mut stream_a).await;
    send(&mut sink_b, ClientMessage::Move { san: "e5".to_string() }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;
    send(&mut sink_a, ClientMessage::Move { san: "Nf3".to_string() }).await;
    recv(&mut stream_b).await;
    recv(&mut stream_a).await;

    // B drops.
    sink_b.close().await.ok();
    let disconnect_notice = recv(&mut stream_a).await;
    assert!(matches!(
        disconnect_notice,
        ServerMessage::OpponentDisconnected { .. }
    ));

    // B reconnects with the same session id before the grace period expires.
    let (mut sink_b2, mut stream_b2) = connect(addr).await;
    send(
        &mut sink_b2,
        ClientMessage::Auth {
            session_id: "recon-b".to_string(),
        },
    )
    .await;
    assert!(matches!(recv(&mut stream_b2).await, ServerMessage::AuthOk));

    let reconnect = recv(&mut stream_b2).await;
    match reconnect {
        ServerMessage::Reconnect {
            color,
            moves,
            opponent_connected,
            ..
        } => {
            assert_eq!(color, chess_room_server::protocol::Color::Black);
            assert_eq!(moves, vec!["e4".to_string(), "e5".to_string(), "Nf3".to_string()]);
            assert!(opponent_connected);
        }
        other => panic!("expected reconnect frame, got {other:?}"),
    }

    let opponent_notice = recv(&mut stream_a).await;
    assert!(matches!(opponent_notice, ServerMessage::OpponentReconnected));
}

#[tokio::test]
async fn abandonment_after_grace_period_awards_the_connected_player() {
    let addr = start_test_server(fast_timers_config()).await;
    let (mut sink_a, mut stream_a) = connect(addr).await;
    let (mut sink_b, mut stream_b) = connect(addr).await;
    auth(&mut sink_a, &mut stream_a, "aband-a").await;
    auth(&mut sink_b, &mut stream_b, "aband-b").await;

    send(&mut sink_a, ClientMessage::CreateRoom { name: None, time_control: Some("none".parse().unwrap()) }).await;
    let room_id = match recv(&mut stream_a).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut sink_b, ClientMessage::JoinRoom { room_id: room_id.0, name: None }).await;
    recv(&mut stream_a).await;
    recv(&mut stream_b).await;

    sink_b.close().await.ok();
    assert!(matches!(
        recv(&mut stream_a).await,
        ServerMessage::OpponentDisconnected { timeout: _ }
    ));

    // Grace period is 150ms in this config; wait past it for the abandon
    // timer to fire.
    let end = recv(&mut stream_a).await;
    match end {
        ServerMessage::GameEnd { result, reason } => {
            assert_eq!(result, "1-0");
            assert_eq!(reason, "abandoned");
        }
        other => panic!("expected game_end, got {other:?}"),
    }
}

#[tokio::test]
async fn matchmaker_wildcard_pairs_with_specific_time_control() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink_x, mut stream_x) = connect(addr).await;
    let (mut sink_y, mut stream_y) = connect(addr).await;
    auth(&mut sink_x, &mut stream_x, "mm-x").await;
    auth(&mut sink_y, &mut stream_y, "mm-y").await;

    send(
        &mut sink_x,
        ClientMessage::QuickMatch {
            name: Some("X".to_string()),
            time_control: Some("3+2".parse().unwrap()),
        },
    )
    .await;
    match recv(&mut stream_x).await {
        ServerMessage::QueueJoined { time_control, position } => {
            assert_eq!(time_control, "3+2");
            assert_eq!(position, 1);
        }
        other => panic!("expected queue_joined, got {other:?}"),
    }

    send(
        &mut sink_y,
        ClientMessage::QuickMatch {
            name: Some("Y".to_string()),
            time_control: Some("any".parse().unwrap()),
        },
    )
    .await;

    let start_x = recv(&mut stream_x).await;
    let start_y = recv(&mut stream_y).await;
    for start in [start_x, start_y] {
        match start {
            ServerMessage::GameStart { time_control, .. } => assert_eq!(time_control, "3+2"),
            other => panic!("expected game_start, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn cancel_queue_leaves_without_pairing() {
    let addr = start_test_server(Config::default()).await;
    let (mut sink, mut stream) = connect(addr).await;
    auth(&mut sink, &mut stream, "cancel-1").await;

    send(&mut sink, ClientMessage::QuickMatch { name: None, time_control: None }).await;
    assert!(matches!(recv(&mut stream).await, ServerMessage::QueueJoined { .. }));

    send(&mut sink, ClientMessage::CancelQueue).await;
    assert!(matches!(recv(&mut stream).await, ServerMessage::QueueLeft));

    // A second quick_match now queues fresh rather than erroring.
    send(&mut sink, ClientMessage::QuickMatch { name: None, time_control: None }).await;
    assert!(matches!(recv(&mut stream).await, ServerMessage::QueueJoined { .. }));
}
