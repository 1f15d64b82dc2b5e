//! Rule engine adapter. Backs the four operations the room state machine
//! needs — `apply`, `turn`, `fen`, `outcome` — with `shakmaty`, rather than
//! hand-rolling chess legality.
//!
//! Threefold repetition isn't tracked by `shakmaty::Chess` itself (a
//! position alone doesn't carry history), so this adapter keeps a multiset
//! of reduced FEN keys (board + turn + castling + en passant, dropping the
//! halfmove/fullmove counters) alongside the position.

use std::collections::HashMap;
use std::str::FromStr;

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{Chess, EnPassantMode, Move, Position};

use crate::protocol::Color;

/// Reason a game ended in a draw, used for outcome reporting and for the
/// `FinishGame` persistence call's `reason` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    Repetition,
    InsufficientMaterial,
    FiftyMove,
}

impl DrawReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DrawReason::Stalemate => "stalemate",
            DrawReason::Repetition => "repetition",
            DrawReason::InsufficientMaterial => "insufficient",
            DrawReason::FiftyMove => "fifty-move",
        }
    }
}

/// Terminal outcome of a position, as reported by the rule engine. Does not
/// cover resignation, timeout, or abandonment — those are decided by the
/// room, not the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Checkmate { winner: Color },
    Draw { reason: DrawReason },
}

impl GameOutcome {
    /// The `result` string as the persistence interface and wire protocol
    /// expect it: `"1-0"`, `"0-1"`, or `"1/2-1/2"`.
    #[must_use]
    pub fn result_str(&self) -> &'static str {
        match self {
            GameOutcome::Checkmate { winner: Color::White } => "1-0",
            GameOutcome::Checkmate { winner: Color::Black } => "0-1",
            GameOutcome::Draw { .. } => "1/2-1/2",
        }
    }

    #[must_use]
    pub fn reason_str(&self) -> &'static str {
        match self {
            GameOutcome::Checkmate { .. } => "checkmate",
            GameOutcome::Draw { reason } => reason.as_str(),
        }
    }
}

/// Result of successfully applying a SAN move.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub fen: String,
    pub outcome: Option<GameOutcome>,
}

/// A SAN move that failed to parse or is illegal in the current position.
#[derive(Debug, Clone, thiserror::Error)]
#[error("illegal move `{0}`")]
pub struct IllegalMove(pub String);

/// A single game's rule-engine state: current position plus repetition
/// history.
#[derive(Clone)]
pub struct RuleEngine {
    position: Chess,
    position_counts: HashMap<String, u32>,
}

impl RuleEngine {
    #[must_use]
    pub fn new() -> Self {
        let position = Chess::default();
        let mut engine = Self {
            position,
            position_counts: HashMap::new(),
        };
        engine.record_position();
        engine
    }

    #[must_use]
    pub fn turn(&self) -> Color {
        self.position.turn().into()
    }

    #[must_use]
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Parse and play a SAN move against the current position. Leaves the
    /// engine untouched on failure.
    pub fn apply(&mut self, san: &str) -> Result<AppliedMove, IllegalMove> {
        let parsed = San::from_str(san).map_err(|_| IllegalMove(san.to_string()))?;
        let mv: Move = parsed
            .to_move(&self.position)
            .map_err(|_| IllegalMove(san.to_string()))?;
        let next = self
            .position
            .clone()
            .play(&mv)
            .map_err(|_| IllegalMove(san.to_string()))?;
        self.position = next;
        self.record_position();

        Ok(AppliedMove {
            fen: self.fen(),
            outcome: self.outcome(),
        })
    }

    /// Current terminal outcome, if any, in the priority order the
    /// specification fixes: checkmate, stalemate, threefold repetition,
    /// insufficient material, fifty-move.
    #[must_use]
    pub fn outcome(&self) -> Option<GameOutcome> {
        if self.position.is_checkmate() {
            let winner: Color = (!self.position.turn()).into();
            return Some(GameOutcome::Checkmate { winner });
        }
        if self.position.is_stalemate() {
            return Some(GameOutcome::Draw {
                reason: DrawReason::Stalemate,
            });
        }
        if self.position_counts.values().any(|&count| count >= 3) {
            return Some(GameOutcome::Draw {
                reason: DrawReason::Repetition,
            });
        }
        if self.position.is_insufficient_material() {
            return Some(GameOutcome::Draw {
                reason: DrawReason::InsufficientMaterial,
            });
        }
        if self.position.halfmoves() >= 100 {
            return Some(GameOutcome::Draw {
                reason: DrawReason::FiftyMove,
            });
        }
        None
    }

    fn position_key(&self) -> String {
        let fen = Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string();
        fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    fn record_position(&mut self) {
        *self.position_counts.entry(self.position_key()).or_insert(0) += 1;
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
