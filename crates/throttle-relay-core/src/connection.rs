//! Per-session bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::config::Direction;

/// Represents the state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Upstream is being dialed.
    Dialing,
    /// Both paths are transferring data.
    Active,
    /// Both streams are closed.
    Closed,
}

/// Information about a single relay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session identifier.
    pub id: Uuid,

    /// Client address.
    pub client_addr: SocketAddr,

    /// Upstream address as configured.
    pub upstream_addr: String,

    /// Throttled path(s) of this session.
    pub direction: Direction,

    /// Current state.
    pub state: SessionState,

    /// When the client was accepted.
    pub connected_at: DateTime<Utc>,

    /// When the session ended (if applicable).
    pub closed_at: Option<DateTime<Utc>>,

    /// Bytes forwarded client -> upstream.
    pub bytes_to_upstream: u64,

    /// Bytes forwarded upstream -> client.
    pub bytes_to_client: u64,
}

impl SessionInfo {
    /// Create a new session info.
    pub fn new(client_addr: SocketAddr, upstream_addr: String, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_addr,
            upstream_addr,
            direction,
            state: SessionState::Dialing,
            connected_at: Utc::now(),
            closed_at: None,
            bytes_to_upstream: 0,
            bytes_to_client: 0,
        }
    }

    /// Mark the session as active.
    pub fn set_active(&mut self) {
        self.state = SessionState::Active;
    }

    /// Mark the session as closed.
    pub fn set_closed(&mut self, bytes_to_upstream: u64, bytes_to_client: u64) {
        self.state = SessionState::Closed;
        self.closed_at = Some(Utc::now());
        self.bytes_to_upstream = bytes_to_upstream;
        self.bytes_to_client = bytes_to_client;
    }

    /// Session duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        let end = self.closed_at.unwrap_or_else(Utc::now);
        (end - self.connected_at).num_milliseconds()
    }
}
