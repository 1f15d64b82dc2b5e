//! Room: the heart of the system. A pure state machine — no I/O, no timers,
//! no broadcasting. The orchestrating code in
//! [`crate::server::room_service`] and [`crate::server::GameServer`] drives
//! persistence calls, timer arming, and message delivery off the values
//! these methods return.

use crate::protocol::{ClockSnapshot, Color, MoveRecord, RoomId, SessionId, TimeControl};
use crate::rules::RuleEngine;

/// Lifecycle state (§4.6.1). `Gone` is not represented explicitly — a room
/// reaching that state is simply removed from the room map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// One seated player.
#[derive(Debug, Clone)]
pub struct Slot {
    pub session_id: SessionId,
    pub name: String,
    pub connected: bool,
    pub disconnected_at_ms: Option<i64>,
}

impl Slot {
    fn new(session_id: SessionId, name: String) -> Self {
        Self {
            session_id,
            name,
            connected: true,
            disconnected_at_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Clocks {
    pub w: i64,
    pub b: i64,
    pub last_move_at_ms: i64,
}

impl Clocks {
    /// Display invariant (§4.6.2): the side to move reads live (clock minus
    /// elapsed, floored at zero); the other side reads verbatim.
    fn live_snapshot(&self, side_to_move: Color, now_ms: i64) -> ClockSnapshot {
        let elapsed = (now_ms - self.last_move_at_ms).max(0);
        match side_to_move {
            Color::White => ClockSnapshot {
                w: (self.w - elapsed).max(0),
                b: self.b,
            },
            Color::Black => ClockSnapshot {
                w: self.w,
                b: (self.b - elapsed).max(0),
            },
        }
    }
}

impl From<Clocks> for ClockSnapshot {
    fn from(c: Clocks) -> Self {
        ClockSnapshot { w: c.w, b: c.b }
    }
}

/// Move pipeline failures (§4.6.2, §7). Each message is exactly the domain
/// error string the wire protocol carries.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MoveError {
    #[error("Game not in progress")]
    GameNotInProgress,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Invalid move")]
    InvalidMove,
}

/// Result of a successfully-processed move attempt. A timeout loss is
/// still "successful" from the pipeline's point of view — it is a terminal
/// outcome, not a rejection.
#[derive(Debug, Clone)]
pub enum MoveApplied {
    Played {
        record: MoveRecord,
        clocks: Option<ClockSnapshot>,
        finished: Option<(String, String)>,
    },
    TimeoutLoss {
        result: String,
        reason: String,
    },
}

pub struct Room {
    pub id: RoomId,
    pub status: RoomStatus,
    pub time_control: TimeControl,
    pub rules: RuleEngine,
    pub moves: Vec<MoveRecord>,
    pub clocks: Option<Clocks>,
    pub white: Slot,
    pub black: Option<Slot>,
    pub persistence_id: Option<uuid::Uuid>,
    pub rematch_offered_by: Option<Color>,
    pub result: Option<(String, String)>,
    pub disconnect_timer: Option<super::timers::TimerHandle>,
    pub cleanup_timer: Option<super::timers::TimerHandle>,
}

impl Room {
    #[must_use]
    pub fn create_waiting(
        id: RoomId,
        time_control: TimeControl,
        creator_session: SessionId,
        creator_name: String,
    ) -> Self {
        Self {
            id,
            status: RoomStatus::Waiting,
            time_control,
            rules: RuleEngine::new(),
            moves: Vec::new(),
            clocks: None,
            white: Slot::new(creator_session, creator_name),
            black: None,
            persistence_id: None,
            rematch_offered_by: None,
            result: None,
            disconnect_timer: None,
            cleanup_timer: None,
        }
    }

    #[must_use]
    pub fn can_join(&self) -> bool {
        matches!(self.status, RoomStatus::Waiting)
    }

    /// `waiting → playing` (§4.6.1). Caller is responsible for the
    /// `CreateGame` persistence call and the `game_start` broadcast.
    pub fn seat_second_player(&mut self, session_id: SessionId, name: String, now_ms: i64) {
        self.black = Some(Slot::new(session_id, name));
        self.status = RoomStatus::Playing;
        if let Some(starting_ms) = self.time_control.starting_ms() {
            self.clocks = Some(Clocks {
                w: starting_ms,
                b: starting_ms,
                last_move_at_ms: now_ms,
            });
        }
    }

    #[must_use]
    pub fn slot(&self, color: Color) -> Option<&Slot> {
        match color {
            Color::White => Some(&self.white),
            Color::Black => self.black.as_ref(),
        }
    }

    fn slot_mut(&mut self, color: Color) -> Option<&mut Slot> {
        match color {
            Color::White => Some(&mut self.white),
            Color::Black => self.black.as_mut(),
        }
    }

    #[must_use]
    pub fn color_of(&self, session: &SessionId) -> Option<Color> {
        if &self.white.session_id == session {
            return Some(Color::White);
        }
        if let Some(black) = &self.black {
            if &black.session_id == session {
                return Some(Color::Black);
            }
        }
        None
    }

    #[must_use]
    pub fn live_clocks(&self, now_ms: i64) -> Option<ClockSnapshot> {
        self.clocks
            .map(|clocks| clocks.live_snapshot(self.rules.turn(), now_ms))
    }

    /// The full move pipeline (§4.6.2), steps 1-9 starting from "sender is
    /// bound to this room" (the caller has already resolved `mover`).
    pub fn apply_move(
        &mut self,
        mover: Color,
        san: &str,
        now_ms: i64,
    ) -> Result<MoveApplied, MoveError> {
        if self.status != RoomStatus::Playing {
            return Err(MoveError::GameNotInProgress);
        }
        if self.rules.turn() != mover {
            return Err(MoveError::NotYourTurn);
        }

        // Played against a scratch copy first: a flag-fall discovered during
        // the clock update below must leave the committed rule-engine state
        // untouched, or the move-log-length/ply-count invariant breaks.
        let mut trial = self.rules.clone();
        let applied = trial.apply(san).map_err(|_| MoveError::InvalidMove)?;

        let first_move = self.moves.is_empty();
        let mut clocks = self.clocks;

        if let Some(c) = clocks.as_mut() {
            if !first_move {
                let elapsed = now_ms - c.last_move_at_ms;
                let remaining = match mover {
                    Color::White => {
                        c.w -= elapsed;
                        c.w
                    }
                    Color::Black => {
                        c.b -= elapsed;
                        c.b
                    }
                };
                if remaining <= 0 {
                    match mover {
                        Color::White => c.w = 0,
                        Color::Black => c.b = 0,
                    }
                    c.last_move_at_ms = now_ms;
                    self.clocks = clocks;

                    let winner = mover.opposite();
                    let result = result_str_for_winner(winner).to_string();
                    let reason = "timeout".to_string();
                    self.finalize(result.clone(), reason.clone());
                    return Ok(MoveApplied::TimeoutLoss { result, reason });
                }
                let increment = self.time_control.increment_ms();
                match mover {
                    Color::White => c.w += increment,
                    Color::Black => c.b += increment,
                }
            }
            c.last_move_at_ms = now_ms;
        }

        self.rules = trial;
        self.clocks = clocks;

        let ply = self.moves.len() as u32;
        let record = MoveRecord {
            ply,
            san: san.to_string(),
            fen: applied.fen,
            timestamp_ms: now_ms,
            side: mover,
        };
        self.moves.push(record.clone());

        let clock_snapshot = clocks.map(ClockSnapshot::from);
        let finished = applied.outcome.map(|outcome| {
            let result = outcome.result_str().to_string();
            let reason = outcome.reason_str().to_string();
            self.finalize(result.clone(), reason.clone());
            (result, reason)
        });

        Ok(MoveApplied::Played {
            record,
            clocks: clock_snapshot,
            finished,
        })
    }

    /// `playing → finished` via resignation.
    pub fn resign(&mut self, resigner: Color) -> (String, String) {
        let winner = resigner.opposite();
        let result = result_str_for_winner(winner).to_string();
        let reason = "resignation".to_string();
        self.finalize(result.clone(), reason.clone());
        (result, reason)
    }

    /// `playing → finished` via mutual agreement.
    pub fn agree_draw(&mut self) -> (String, String) {
        let result = "1/2-1/2".to_string();
        let reason = "agreement".to_string();
        self.finalize(result.clone(), reason.clone());
        (result, reason)
    }

    /// `playing → finished` via abandonment (disconnect grace expired).
    pub fn abandon(&mut self, absent: Color) -> (String, String) {
        let winner = absent.opposite();
        let result = result_str_for_winner(winner).to_string();
        let reason = "abandoned".to_string();
        self.finalize(result.clone(), reason.clone());
        (result, reason)
    }

    fn finalize(&mut self, result: String, reason: String) {
        self.status = RoomStatus::Finished;
        self.result = Some((result, reason));
    }

    pub fn mark_disconnected(&mut self, color: Color, now_ms: i64) {
        if let Some(slot) = self.slot_mut(color) {
            slot.connected = false;
            slot.disconnected_at_ms = Some(now_ms);
        }
    }

    pub fn mark_reconnected(&mut self, color: Color) {
        if let Some(slot) = self.slot_mut(color) {
            slot.connected = true;
            slot.disconnected_at_ms = None;
        }
    }

    /// `finished → playing` via accepted rematch (§4.6.1): colours swap,
    /// fresh rule engine, move log, and clocks. Caller replaces
    /// `persistence_id` after issuing a fresh `CreateGame` call.
    pub fn start_rematch(&mut self, now_ms: i64) {
        std::mem::swap(&mut self.white, self.black.as_mut().expect("rematch requires two seated players"));
        self.rules = RuleEngine::new();
        self.moves.clear();
        self.result = None;
        self.rematch_offered_by = None;
        self.status = RoomStatus::Playing;
        if let Some(starting_ms) = self.time_control.starting_ms() {
            self.clocks = Some(Clocks {
                w: starting_ms,
                b: starting_ms,
                last_move_at_ms: now_ms,
            });
        } else {
            self.clocks = None;
        }
    }
}

#[must_use]
fn result_str_for_winner(winner: Color) -> &'static str {
    match winner {
        Color::White => "1-0",
        Color::Black => "0-1",
    }
}
