//! Connection <-> session <-> room bookkeeping (§4.2).
//!
//! A connection is a live WebSocket; a session is the client-minted
//! [`SessionId`] from its `auth` frame. The registry tracks which
//! connection currently speaks for a session (so a stale connection can be
//! told apart from the one that superseded it on reconnect) and which room,
//! if any, a session is seated in.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{RoomId, ServerMessage, SessionId};

pub type ConnectionId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RegisterConnectionError {
    #[error("too many connections from this address ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

struct Connection {
    ip: IpAddr,
    sender: mpsc::UnboundedSender<ServerMessage>,
    session_id: Option<SessionId>,
}

pub struct SessionRegistry {
    connections: DashMap<ConnectionId, Connection>,
    /// The connection currently authoritative for a session, if connected.
    session_connection: DashMap<SessionId, ConnectionId>,
    session_room: DashMap<SessionId, RoomId>,
    connections_per_ip: DashMap<IpAddr, AtomicUsize>,
    max_connections_per_ip: usize,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            connections: DashMap::new(),
            session_connection: DashMap::new(),
            session_room: DashMap::new(),
            connections_per_ip: DashMap::new(),
            max_connections_per_ip,
        }
    }

    pub fn register_connection(
        &self,
        ip: IpAddr,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, RegisterConnectionError> {
        let counter = self
            .connections_per_ip
            .entry(ip)
            .or_insert_with(|| AtomicUsize::new(0));
        let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if current > self.max_connections_per_ip {
            counter.fetch_sub(1, Ordering::SeqCst);
            return Err(RegisterConnectionError::IpLimitExceeded {
                current: current - 1,
                limit: self.max_connections_per_ip,
            });
        }

        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            Connection {
                ip,
                sender,
                session_id: None,
            },
        );
        Ok(id)
    }

    /// Binds the `auth` frame's session id to this connection, superseding
    /// whichever connection previously spoke for that session (§4.6.4: the
    /// old connection is assumed already gone, a fresh reconnect just
    /// overwrites the pointer).
    pub fn bind_session(&self, connection_id: ConnectionId, session_id: SessionId) {
        if let Some(mut conn) = self.connections.get_mut(&connection_id) {
            conn.session_id = Some(session_id.clone());
        }
        self.session_connection.insert(session_id, connection_id);
    }

    pub fn unregister_connection(&self, connection_id: ConnectionId) -> Option<SessionId> {
        let Some((_, conn)) = self.connections.remove(&connection_id) else {
            return None;
        };
        if let Some(counter) = self.connections_per_ip.get(&conn.ip) {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(session_id) = &conn.session_id {
            // Only clear the session->connection pointer if this connection
            // is still the current one (a reconnect may have already
            // replaced it before the old socket's close event arrives).
            if let Some(current) = self.session_connection.get(session_id) {
                if *current == connection_id {
                    drop(current);
                    self.session_connection.remove(session_id);
                }
            }
        }
        conn.session_id
    }

    #[must_use]
    pub fn is_connected(&self, session_id: &SessionId) -> bool {
        self.session_connection.contains_key(session_id)
    }

    pub fn sender_for(&self, session_id: &SessionId) -> Option<mpsc::UnboundedSender<ServerMessage>> {
        let connection_id = *self.session_connection.get(session_id)?;
        self.connections
            .get(&connection_id)
            .map(|c| c.sender.clone())
    }

    pub fn set_session_room(&self, session_id: SessionId, room_id: RoomId) {
        self.session_room.insert(session_id, room_id);
    }

    pub fn clear_session_room(&self, session_id: &SessionId) {
        self.session_room.remove(session_id);
    }

    #[must_use]
    pub fn room_of(&self, session_id: &SessionId) -> Option<RoomId> {
        self.session_room.get(session_id).map(|r| r.clone())
    }
}
