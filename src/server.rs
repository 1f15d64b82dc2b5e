use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::persistence::GameStore;
use crate::protocol::{RoomId, ServerMessage, SessionId};

mod heartbeat;
mod maintenance;
mod matchmaker;
mod message_router;
mod metrics;
mod reconnection_service;
mod room;
mod room_service;
mod session_registry;
mod timers;

pub use heartbeat::PingTracker;
pub use matchmaker::Matchmaker;
pub use metrics::ServerMetrics;
pub use room::Room;
pub use session_registry::{ConnectionId, RegisterConnectionError, SessionRegistry};

/// Current wall-clock time in milliseconds, the only place the room
/// pipeline reads it from. A fake clock for tests would replace this
/// function's call sites, not its body.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Top-level server state: every room, the matchmaker queues, the
/// connection/session/room bookkeeping, and the handle to persistence.
/// Held behind an `Arc` and shared across every WebSocket task.
pub struct GameServer {
    pub(crate) config: Arc<Config>,
    pub(crate) rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    pub(crate) matchmaker: Matchmaker,
    pub(crate) registry: SessionRegistry,
    pub(crate) store: Arc<dyn GameStore>,
    pub(crate) metrics: ServerMetrics,
}

impl GameServer {
    #[must_use]
    pub fn new(config: Arc<Config>, store: Arc<dyn GameStore>) -> Arc<Self> {
        let registry = SessionRegistry::new(config.server.max_connections_per_ip);
        Arc::new(Self {
            config,
            rooms: DashMap::new(),
            matchmaker: Matchmaker::new(),
            registry,
            store,
            metrics: ServerMetrics::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register_connection(
        &self,
        ip: IpAddr,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, RegisterConnectionError> {
        let connection_id = self.registry.register_connection(ip, sender)?;
        self.metrics.connection_opened();
        Ok(connection_id)
    }

    /// Tears down everything a closed connection owned: the connection
    /// record itself, and — if this was still the session's live connection
    /// — arms the disconnect-grace timer on the seated room, if any.
    pub async fn handle_connection_closed(self: &Arc<Self>, connection_id: ConnectionId) {
        self.metrics.connection_closed();
        let Some(session_id) = self.registry.unregister_connection(connection_id) else {
            return;
        };
        if self.registry.is_connected(&session_id) {
            // Superseded by a reconnect already; nothing to do.
            return;
        }
        self.matchmaker.leave(&session_id);
        if let Some(room_id) = self.registry.room_of(&session_id) {
            self.on_player_disconnected(room_id, session_id).await;
        }
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn render_prometheus_metrics(&self) -> String {
        self.metrics.render_prometheus(self.room_count())
    }
}
