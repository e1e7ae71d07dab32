//! Connection lifecycle stages

use core::fmt;
use serde::{Deserialize, Serialize};

/// Lifecycle stage of the logical connection
///
/// A reconciler starts `Offline` and cycles through the other stages
/// indefinitely; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No network and no pending connect request
    #[default]
    Offline,
    /// No network or temporarily suppressed; retried when available
    Waiting,
    /// An attempt is resolving and opening the stream
    Connecting,
    /// Creating a new account before authenticating
    Registration,
    /// Stream is open, authenticating
    Authentication,
    /// Authenticated and usable
    Connected,
}

impl ConnectionState {
    /// Whether a forced restart is meaningful from this state
    pub fn is_connectable(&self) -> bool {
        !matches!(self, ConnectionState::Offline)
    }

    /// Whether an attempt is in flight or established in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Registration
                | ConnectionState::Authentication
                | ConnectionState::Connected
        )
    }

    /// Get current state name for logging
    pub fn state_name(&self) -> &'static str {
        match self {
            ConnectionState::Offline => "offline",
            ConnectionState::Waiting => "waiting",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Registration => "registration",
            ConnectionState::Authentication => "authentication",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}
