//! Persistence interface (§4.5): a narrow, idempotent seam for a historical
//! games store. Called only from [`crate::server::room::Room`]; never
//! consulted for live-game state, which is authoritative in memory.
//!
//! The teacher ships only an in-memory [`GameDatabase`] and documents the
//! trait as the seam a real backend would implement — this crate does the
//! same: [`GameStore`] is the trait a Postgres/SQLite-backed store would
//! implement, and [`InMemoryGameStore`] is the only implementation shipped.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::protocol::MoveRecord;

/// Parameters for [`GameStore::create_game`].
#[derive(Debug, Clone)]
pub struct NewGame {
    pub time_control: String,
    pub starting_fen: String,
    pub white_name: String,
    pub black_name: String,
}

/// A finished game's terminal record.
#[derive(Debug, Clone)]
pub struct GameResult {
    pub result: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
struct StoredGame {
    time_control: String,
    #[allow(dead_code)]
    starting_fen: String,
    #[allow(dead_code)]
    white_name: String,
    #[allow(dead_code)]
    black_name: String,
    moves: Vec<MoveRecord>,
    result: Option<GameResult>,
}

/// Errors a `GameStore` implementation may surface. Per §7, callers log and
/// otherwise ignore these — persistence is best-effort and never blocks the
/// live game.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("game {0} not found")]
    NotFound(Uuid),
}

/// Contract for a historical-games store. `game_type` is always
/// `"multiplayer"`; player records are always `{isAI: false, elo: null}` at
/// this layer, since this crate never plays against AI opponents.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn create_game(&self, game: NewGame) -> Result<Uuid, PersistenceError>;

    /// Idempotent: a retried call for the same `(id, ply)` is a no-op.
    async fn append_move(
        &self,
        id: Uuid,
        mv: MoveRecord,
    ) -> Result<(), PersistenceError>;

    /// Idempotent at the call site; repeated calls simply overwrite the
    /// stored terminal result.
    async fn finish_game(&self, id: Uuid, result: GameResult) -> Result<(), PersistenceError>;
}

/// In-memory `GameStore`. The only store this crate ships, matching the
/// teacher's own in-memory-only persistence stance.
#[derive(Default)]
pub struct InMemoryGameStore {
    games: Mutex<HashMap<Uuid, StoredGame>>,
}

impl InMemoryGameStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn create_game(&self, game: NewGame) -> Result<Uuid, PersistenceError> {
        let id = Uuid::new_v4();
        let stored = StoredGame {
            time_control: game.time_control,
            starting_fen: game.starting_fen,
            white_name: game.white_name,
            black_name: game.black_name,
            moves: Vec::new(),
            result: None,
        };
        self.games.lock().unwrap_or_else(|e| e.into_inner()).insert(id, stored);
        tracing::debug!(game_id = %id, "persisted game creation");
        Ok(id)
    }

    async fn append_move(&self, id: Uuid, mv: MoveRecord) -> Result<(), PersistenceError> {
        let mut games = self.games.lock().unwrap_or_else(|e| e.into_inner());
        let game = games.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        if game.moves.iter().any(|existing| existing.ply == mv.ply) {
            return Ok(());
        }
        game.moves.push(mv);
        Ok(())
    }

    async fn finish_game(&self, id: Uuid, result: GameResult) -> Result<(), PersistenceError> {
        let mut games = self.games.lock().unwrap_or_else(|e| e.into_inner());
        let game = games.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        game.result = Some(result);
        Ok(())
    }
}
