//! WebSocket-level liveness tracking. The wire protocol has no application
//! `ping`/`pong` messages — liveness runs underneath it, as plain WebSocket
//! ping/pong frames sent on the interval in [`crate::config::ServerConfig`].
//! [`PingTracker`] is handed to each connection task so it can decide when
//! a silent socket should be treated as dead.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct PingTracker {
    last_pong: Mutex<Instant>,
}

impl PingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_pong: Mutex::new(Instant::now()),
        }
    }

    pub fn record_pong(&self) {
        *self.last_pong.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// A connection that hasn't answered a ping within twice the configured
    /// interval is considered dead (§ ambient heartbeat policy).
    #[must_use]
    pub fn is_stale(&self, ping_interval: Duration) -> bool {
        let last = *self.last_pong.lock().unwrap_or_else(|e| e.into_inner());
        last.elapsed() > ping_interval * 2
    }
}

impl Default for PingTracker {
    fn default() -> Self {
        Self::new()
    }
}
