//! Client-message handlers: `create_room`, `join_room`, `quick_match`,
//! `cancel_queue`, the in-game actions, and the draw/rematch offer
//! protocols (§4.3, §4.6). Each handler resolves the caller's session to a
//! room (or the matchmaker), mutates it, persists, and pushes frames to
//! whichever sessions need to hear about it.

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{validation, Color, RoomId, ServerMessage, SessionId, TimeControl, TimeControlTag};

use super::matchmaker::{JoinOutcome, MatchmakerError, QueueEntry};
use super::room::{MoveApplied, MoveError, Room, RoomStatus};
use super::{now_ms, GameServer};

fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoomAccessError {
    #[error("Room not found")]
    NotFound,
    #[error("Room is not accepting players")]
    NotAcceptingPlayers,
    #[error("You are already in this room")]
    AlreadyInThisRoom,
    #[error("Not in a room")]
    NotInARoom,
    #[error("You are not a player in this room")]
    NotAPlayerInThisRoom,
    #[error("Server is at capacity, try again later")]
    AtCapacity,
}

impl GameServer {
    pub(crate) async fn send(&self, session: &SessionId, message: ServerMessage) {
        if matches!(&message, ServerMessage::Error { .. }) {
            self.metrics.error_sent();
        }
        if let Some(sender) = self.registry.sender_for(session) {
            let _ = sender.send(message);
        }
    }

    fn default_time_control(&self) -> TimeControl {
        self.config
            .server
            .default_time_control
            .parse()
            .unwrap_or(TimeControl::DEFAULT)
    }

    fn resolve_tag(&self, tag: Option<TimeControlTag>) -> TimeControl {
        match tag {
            Some(TimeControlTag::Control(tc)) => tc,
            Some(TimeControlTag::Any) | None => self.default_time_control(),
        }
    }

    fn display_name(&self, name: Option<String>, session: &SessionId) -> String {
        match name {
            Some(n) if validation::validate_player_name_with_config(&n, &self.config.protocol).is_ok() => n,
            _ => session.to_string(),
        }
    }

    fn fresh_room_id(&self) -> RoomId {
        let mut code = crate::protocol::room_codes::generate_room_code_with_config(&self.config.protocol);
        while self.rooms.contains_key(&RoomId(code.clone())) {
            code = crate::protocol::room_codes::generate_room_code_with_config(&self.config.protocol);
        }
        RoomId(code)
    }

    pub async fn create_room(
        self: &Arc<Self>,
        session: SessionId,
        name: Option<String>,
        time_control: Option<TimeControlTag>,
    ) {
        if self.registry.room_of(&session).is_some() {
            self.send(&session, ServerMessage::error(RoomAccessError::AlreadyInThisRoom.to_string()))
                .await;
            return;
        }
        if self.rooms.len() >= self.config.server.max_rooms {
            self.send(&session, ServerMessage::error(RoomAccessError::AtCapacity.to_string()))
                .await;
            return;
        }

        let tc = self.resolve_tag(time_control);
        let player_name = self.display_name(name, &session);
        let room_id = self.fresh_room_id();

        let room = Room::create_waiting(room_id.clone(), tc, session.clone(), player_name);
        self.rooms
            .insert(room_id.clone(), Arc::new(tokio::sync::Mutex::new(room)));
        self.registry.set_session_room(session.clone(), room_id.clone());
        self.metrics.room_created();

        self.send(
            &session,
            ServerMessage::RoomCreated {
                room_id,
                color: Color::White,
            },
        )
        .await;
    }

    pub async fn join_room(self: &Arc<Self>, session: SessionId, room_code: String, name: Option<String>) {
        let normalized_code = room_code.to_uppercase();
        if let Err(message) = validation::validate_room_code_with_config(&normalized_code, &self.config.protocol) {
            self.send(&session, ServerMessage::error(message)).await;
            return;
        }
        let room_id = RoomId(normalized_code);
        let Some(entry) = self.rooms.get(&room_id) else {
            self.send(&session, ServerMessage::error(RoomAccessError::NotFound.to_string()))
                .await;
            return;
        };
        let handle = Arc::clone(entry.value());
        drop(entry);

        let player_name = self.display_name(name, &session);
        let (white_session, white_name, black_name, fen, tc_str);
        {
            let mut room = handle.lock().await;
            if !room.can_join() {
                self.send(&session, ServerMessage::error(RoomAccessError::NotAcceptingPlayers.to_string()))
                    .await;
                return;
            }
            if room.color_of(&session).is_some() {
                self.send(&session, ServerMessage::error(RoomAccessError::AlreadyInThisRoom.to_string()))
                    .await;
                return;
            }
            room.seat_second_player(session.clone(), player_name.clone(), now_ms());
            white_session = room.white.session_id.clone();
            white_name = room.white.name.clone();
            black_name = player_name.clone();
            fen = room.rules.fen();
            tc_str = room.time_control.to_string();
        }

        self.registry.set_session_room(session.clone(), room_id.clone());

        let persistence_id = self
            .store
            .create_game(crate::persistence::NewGame {
                time_control: tc_str.clone(),
                starting_fen: fen.clone(),
                white_name: white_name.clone(),
                black_name: black_name.clone(),
            })
            .await
            .ok();
        if persistence_id.is_some() {
            handle.lock().await.persistence_id = persistence_id;
        }

        self.send(
            &white_session,
            ServerMessage::GameStart {
                room_id: room_id.clone(),
                color: Color::White,
                fen: fen.clone(),
                time_control: tc_str.clone(),
                opponent_name: black_name.clone(),
            },
        )
        .await;
        self.send(
            &session,
            ServerMessage::GameStart {
                room_id,
                color: Color::Black,
                fen,
                time_control: tc_str,
                opponent_name: white_name,
            },
        )
        .await;
    }

    pub async fn quick_match(
        self: &Arc<Self>,
        session: SessionId,
        name: Option<String>,
        time_control: Option<TimeControlTag>,
    ) {
        if self.registry.room_of(&session).is_some() {
            self.send(&session, ServerMessage::error("Already in a game")).await;
            return;
        }
        if self.rooms.len() >= self.config.server.max_rooms {
            self.send(&session, ServerMessage::error(RoomAccessError::AtCapacity.to_string()))
                .await;
            return;
        }

        let tag = time_control.unwrap_or(TimeControlTag::Any);
        let player_name = self.display_name(name, &session);
        let registry = &self.registry;
        let outcome = self.matchmaker.join(
            QueueEntry {
                session_id: session.clone(),
                name: player_name.clone(),
            },
            tag.clone(),
            |id| registry.is_connected(id),
        );

        match outcome {
            Err(MatchmakerError::AlreadyInQueue) => {
                self.send(&session, ServerMessage::error(MatchmakerError::AlreadyInQueue.to_string()))
                    .await;
            }
            Ok(JoinOutcome::Queued { position }) => {
                self.send(
                    &session,
                    ServerMessage::QueueJoined {
                        time_control: tag.as_tag_str(),
                        position,
                    },
                )
                .await;
            }
            Ok(JoinOutcome::Matched {
                opponent,
                time_control,
            }) => {
                // Unbiased coin flip decides colours (§4.3 step 6); which
                // side popped the queue has no bearing on who plays white.
                if rand::random::<bool>() {
                    self.start_matched_game(opponent.session_id, opponent.name, session, player_name, time_control)
                        .await;
                } else {
                    self.start_matched_game(session, player_name, opponent.session_id, opponent.name, time_control)
                        .await;
                }
            }
        }
    }

    async fn start_matched_game(
        self: &Arc<Self>,
        white_session: SessionId,
        white_name: String,
        black_session: SessionId,
        black_name: String,
        time_control: TimeControl,
    ) {
        let room_id = self.fresh_room_id();

        let mut room = Room::create_waiting(room_id.clone(), time_control, white_session.clone(), white_name.clone());
        room.seat_second_player(black_session.clone(), black_name.clone(), now_ms());
        let fen = room.rules.fen();
        let tc_str = room.time_control.to_string();

        room.persistence_id = self
            .store
            .create_game(crate::persistence::NewGame {
                time_control: tc_str.clone(),
                starting_fen: fen.clone(),
                white_name: white_name.clone(),
                black_name: black_name.clone(),
            })
            .await
            .ok();

        self.rooms
            .insert(room_id.clone(), Arc::new(tokio::sync::Mutex::new(room)));
        self.registry.set_session_room(white_session.clone(), room_id.clone());
        self.registry.set_session_room(black_session.clone(), room_id.clone());
        self.metrics.room_created();
        self.metrics.match_made();

        self.send(
            &white_session,
            ServerMessage::GameStart {
                room_id: room_id.clone(),
                color: Color::White,
                fen: fen.clone(),
                time_control: tc_str.clone(),
                opponent_name: black_name,
            },
        )
        .await;
        self.send(
            &black_session,
            ServerMessage::GameStart {
                room_id,
                color: Color::Black,
                fen,
                time_control: tc_str,
                opponent_name: white_name,
            },
        )
        .await;
    }

    pub async fn cancel_queue(&self, session: SessionId) {
        self.matchmaker.leave(&session);
        self.send(&session, ServerMessage::QueueLeft).await;
    }

    fn seated_room(&self, session: &SessionId) -> Option<Arc<tokio::sync::Mutex<Room>>> {
        let room_id = self.registry.room_of(session)?;
        self.rooms.get(&room_id).map(|r| Arc::clone(r.value()))
    }

    pub async fn make_move(self: &Arc<Self>, session: SessionId, san: String) {
        let Some(handle) = self.seated_room(&session) else {
            self.send(&session, ServerMessage::error(RoomAccessError::NotInARoom.to_string()))
                .await;
            return;
        };

        let mut room = handle.lock().await;
        let Some(mover) = room.color_of(&session) else {
            drop(room);
            self.send(&session, ServerMessage::error(RoomAccessError::NotAPlayerInThisRoom.to_string()))
                .await;
            return;
        };
        let room_id = room.id.clone();

        let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            room.apply_move(mover, &san, now_ms())
        })) {
            Ok(outcome) => outcome,
            Err(panic) => {
                drop(room);
                tracing::error!(
                    room = %room_id.0,
                    panic = %panic_payload_message(&panic),
                    "rule engine panicked applying a move; room left in its pre-event state"
                );
                self.send(&session, ServerMessage::error(MoveError::InvalidMove.to_string()))
                    .await;
                return;
            }
        };

        match outcome {
            Err(err) => {
                drop(room);
                self.send(&session, ServerMessage::error(err.to_string())).await;
            }
            Ok(MoveApplied::TimeoutLoss { result, reason }) => {
                let white = room.white.session_id.clone();
                let black = room.black.as_ref().unwrap().session_id.clone();
                let persistence_id = room.persistence_id;
                drop(room);
                self.finish_persisted_game(persistence_id, result.clone(), reason.clone()).await;
                let end = ServerMessage::GameEnd { result, reason };
                self.send(&white, end.clone()).await;
                self.send(&black, end).await;
                self.arm_room_cleanup(room_id);
            }
            Ok(MoveApplied::Played {
                record,
                clocks,
                finished,
            }) => {
                self.metrics.move_played();
                let white = room.white.session_id.clone();
                let black = room.black.as_ref().unwrap().session_id.clone();
                let persistence_id = room.persistence_id;
                drop(room);

                if let Some(id) = persistence_id {
                    let _ = self.store.append_move(id, record.clone()).await;
                }

                let opponent = match mover {
                    Color::White => black.clone(),
                    Color::Black => white.clone(),
                };
                self.send(
                    &opponent,
                    ServerMessage::Move {
                        san: record.san.clone(),
                        fen: record.fen.clone(),
                        clocks,
                    },
                )
                .await;
                self.send(&session, ServerMessage::MoveAck { clocks }).await;

                if let Some((result, reason)) = finished {
                    self.finish_persisted_game(persistence_id, result.clone(), reason.clone())
                        .await;
                    let end = ServerMessage::GameEnd { result, reason };
                    self.send(&white, end.clone()).await;
                    self.send(&black, end).await;
                    self.arm_room_cleanup(room_id);
                }
            }
        }
    }

    async fn finish_persisted_game(&self, persistence_id: Option<uuid::Uuid>, result: String, reason: String) {
        if let Some(id) = persistence_id {
            let _ = self
                .store
                .finish_game(id, crate::persistence::GameResult { result, reason })
                .await;
        }
    }

    pub async fn resign(self: &Arc<Self>, session: SessionId) {
        let Some(handle) = self.seated_room(&session) else {
            return;
        };
        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }
        let room_id = room.id.clone();
        let (result, reason) = room.resign(color);
        let white = room.white.session_id.clone();
        let black = room.black.as_ref().unwrap().session_id.clone();
        let persistence_id = room.persistence_id;
        drop(room);

        self.finish_persisted_game(persistence_id, result.clone(), reason.clone()).await;
        let end = ServerMessage::GameEnd { result, reason };
        self.send(&white, end.clone()).await;
        self.send(&black, end).await;
        self.arm_room_cleanup(room_id);
    }

    pub async fn draw_offer(&self, session: SessionId) {
        let Some(handle) = self.seated_room(&session) else {
            return;
        };
        let room = handle.lock().await;
        let Some(color) = room.color_of(&session) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }
        let opponent = match color {
            Color::White => room.black.as_ref().unwrap().session_id.clone(),
            Color::Black => room.white.session_id.clone(),
        };
        drop(room);
        self.send(&opponent, ServerMessage::DrawOffered).await;
    }

    pub async fn draw_respond(self: &Arc<Self>, session: SessionId, accept: bool) {
        let Some(handle) = self.seated_room(&session) else {
            return;
        };
        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session) else {
            return;
        };
        if room.status != RoomStatus::Playing {
            return;
        }
        let offerer = match color {
            Color::White => room.black.as_ref().unwrap().session_id.clone(),
            Color::Black => room.white.session_id.clone(),
        };

        if accept {
            let room_id = room.id.clone();
            let (result, reason) = room.agree_draw();
            let white = room.white.session_id.clone();
            let black = room.black.as_ref().unwrap().session_id.clone();
            let persistence_id = room.persistence_id;
            drop(room);
            self.finish_persisted_game(persistence_id, result.clone(), reason.clone()).await;
            let end = ServerMessage::GameEnd { result, reason };
            self.send(&white, end.clone()).await;
            self.send(&black, end).await;
            self.arm_room_cleanup(room_id);
        } else {
            drop(room);
            self.send(&offerer, ServerMessage::DrawDeclined).await;
        }
    }

    pub async fn rematch_offer(&self, session: SessionId) {
        let Some(handle) = self.seated_room(&session) else {
            return;
        };
        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session) else {
            return;
        };
        if room.status != RoomStatus::Finished {
            return;
        }
        room.rematch_offered_by = Some(color);
        let opponent = match color {
            Color::White => room.black.as_ref().unwrap().session_id.clone(),
            Color::Black => room.white.session_id.clone(),
        };
        drop(room);
        self.send(&opponent, ServerMessage::RematchOffered).await;
    }

    pub async fn rematch_respond(&self, session: SessionId, accept: bool) {
        let Some(handle) = self.seated_room(&session) else {
            return;
        };
        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session) else {
            return;
        };
        let Some(offerer) = room.rematch_offered_by else {
            return;
        };
        if offerer == color {
            return;
        }
        let other = match color {
            Color::White => room.black.as_ref().unwrap().session_id.clone(),
            Color::Black => room.white.session_id.clone(),
        };

        if !accept {
            room.rematch_offered_by = None;
            drop(room);
            self.send(&other, ServerMessage::RematchDeclined).await;
            return;
        }

        room.start_rematch(now_ms());
        let room_id = room.id.clone();
        let new_white = room.white.session_id.clone();
        let new_black = room.black.as_ref().unwrap().session_id.clone();
        let new_white_name = room.white.name.clone();
        let new_black_name = room.black.as_ref().unwrap().name.clone();
        let fen = room.rules.fen();
        let tc_str = room.time_control.to_string();

        let persistence_id = self
            .store
            .create_game(crate::persistence::NewGame {
                time_control: tc_str.clone(),
                starting_fen: fen.clone(),
                white_name: new_white_name.clone(),
                black_name: new_black_name.clone(),
            })
            .await
            .ok();
        room.persistence_id = persistence_id;
        drop(room);

        self.send(
            &new_white,
            ServerMessage::RematchStart {
                room_id: room_id.clone(),
                color: Color::White,
                fen: fen.clone(),
                time_control: tc_str.clone(),
                opponent_name: new_black_name,
            },
        )
        .await;
        self.send(
            &new_black,
            ServerMessage::RematchStart {
                room_id,
                color: Color::Black,
                fen,
                time_control: tc_str,
                opponent_name: new_white_name,
            },
        )
        .await;
    }

    /// Runs when a room's disconnect-grace timer fires without the absent
    /// player reconnecting (§4.6.4).
    pub(crate) async fn on_disconnect_timeout(self: &Arc<Self>, room_id: RoomId) {
        let Some(entry) = self.rooms.get(&room_id) else { return };
        let handle = Arc::clone(entry.value());
        drop(entry);

        let mut room = handle.lock().await;
        if room.status != RoomStatus::Playing {
            return;
        }
        let absent = [Color::White, Color::Black]
            .into_iter()
            .find(|&c| room.slot(c).is_some_and(|s| !s.connected));
        let Some(absent) = absent else { return };

        let (result, reason) = room.abandon(absent);
        let white = room.white.session_id.clone();
        let black = room.black.as_ref().unwrap().session_id.clone();
        let persistence_id = room.persistence_id;
        room.disconnect_timer = None;
        drop(room);

        self.finish_persisted_game(persistence_id, result.clone(), reason.clone()).await;
        let end = ServerMessage::GameEnd { result, reason };
        self.send(&white, end.clone()).await;
        self.send(&black, end).await;
        self.arm_room_cleanup(room_id);
    }

    /// Runs when a finished room's post-game TTL fires (§4.6.1): the room
    /// is dropped entirely.
    pub(crate) fn on_room_cleanup(&self, room_id: RoomId) {
        let Some((_, handle)) = self.rooms.remove(&room_id) else {
            return;
        };
        if let Ok(room) = handle.try_lock() {
            self.registry.clear_session_room(&room.white.session_id);
            if let Some(black) = room.black.as_ref() {
                self.registry.clear_session_room(&black.session_id);
            }
        }
    }

    pub(crate) fn arm_room_disconnect_timer(self: &Arc<Self>, room_id: RoomId) {
        let server = Arc::clone(self);
        let Some(entry) = self.rooms.get(&room_id) else { return };
        let handle = Arc::clone(entry.value());
        drop(entry);
        let grace = Duration::from_millis(self.config.server.disconnect_grace_ms);
        tokio::spawn(async move {
            let mut room = handle.lock().await;
            // §4.6.4 step 3: only arm if no disconnect timer is already
            // running for this room — a second disconnect must not push
            // back the first player's grace deadline.
            if room.disconnect_timer.is_none() {
                let for_timer = room_id.clone();
                super::timers::rearm(&mut room.disconnect_timer, grace, async move {
                    server.on_disconnect_timeout(for_timer).await;
                });
            }
        });
    }

    pub(crate) fn arm_room_cleanup(self: &Arc<Self>, room_id: RoomId) {
        self.metrics.room_finished();
        let server = Arc::clone(self);
        let Some(entry) = self.rooms.get(&room_id) else { return };
        let handle = Arc::clone(entry.value());
        drop(entry);
        let ttl = Duration::from_millis(self.config.server.room_ttl_after_end_ms);
        tokio::spawn(async move {
            let mut room = handle.lock().await;
            let for_timer = room_id.clone();
            super::timers::rearm(&mut room.cleanup_timer, ttl, async move {
                server.on_room_cleanup(for_timer);
            });
        });
    }

    pub(crate) async fn on_player_disconnected(self: &Arc<Self>, room_id: RoomId, session: SessionId) {
        let Some(entry) = self.rooms.get(&room_id) else { return };
        let handle = Arc::clone(entry.value());
        drop(entry);

        let mut room = handle.lock().await;
        let Some(color) = room.color_of(&session) else { return };

        if room.status == RoomStatus::Waiting {
            drop(room);
            self.registry.clear_session_room(&session);
            self.rooms.remove(&room_id);
            return;
        }

        room.mark_disconnected(color, now_ms());
        let opponent = match color {
            Color::White => room.black.as_ref().map(|s| s.session_id.clone()),
            Color::Black => Some(room.white.session_id.clone()),
        };
        drop(room);

        if let Some(opponent) = opponent {
            let grace_secs = self.config.server.disconnect_grace_ms / 1000;
            self.send(&opponent, ServerMessage::OpponentDisconnected { timeout: grace_secs })
                .await;
        }
        self.arm_room_disconnect_timer(room_id);
    }
}
