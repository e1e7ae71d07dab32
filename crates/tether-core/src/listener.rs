//! Pluggable behaviour around the reconciler
//!
//! The reconciler owns every state transition. Decisions it deliberately does
//! not make (whether the account may connect at all, what to do about a bad
//! certificate or a rejected password) and the user-visible failure signal are
//! delegated to a [`ConnectionListener`]. Every method has a no-op default.
//!
//! Listener methods are invoked with the reconciler's lock released, so a
//! listener may call straight back into the reconciler.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::attempt::AttemptId;
use crate::state::ConnectionState;

// ----------------------------------------------------------------------------
// Listener Trait
// ----------------------------------------------------------------------------

/// Extension points and outbound notifications of a reconciler
pub trait ConnectionListener: Send + Sync {
    /// Whether the account currently wants to be online
    fn is_connection_available(&self, _user_request: bool) -> bool {
        true
    }

    /// The current attempt resolved its SRV record
    fn on_srv_resolved(&self, _attempt: AttemptId) {}

    /// The current attempt was presented an invalid certificate
    fn on_invalid_certificate(&self, _attempt: AttemptId) {}

    /// The server rejected the current attempt's credentials
    fn on_auth_failed(&self, _attempt: AttemptId) {}

    /// The reconciler moved between states
    fn on_state_changed(&self, _from: ConnectionState, _to: ConnectionState) {}

    /// A user-initiated connect ended before reaching `connected`
    fn on_connection_failed(&self) {}
}

/// Listener with every default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ConnectionListener for NoopListener {}

// ----------------------------------------------------------------------------
// Channel Listener
// ----------------------------------------------------------------------------

/// Listener notifications as values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    SrvResolved { attempt: AttemptId },
    InvalidCertificate { attempt: AttemptId },
    AuthFailed { attempt: AttemptId },
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    ConnectionFailed,
}

/// Forwards notifications into an unbounded channel
///
/// Sends after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: ConnectionEvent) {
        let _ = self.sender.send(event);
    }
}

impl ConnectionListener for ChannelListener {
    fn on_srv_resolved(&self, attempt: AttemptId) {
        self.forward(ConnectionEvent::SrvResolved { attempt });
    }

    fn on_invalid_certificate(&self, attempt: AttemptId) {
        self.forward(ConnectionEvent::InvalidCertificate { attempt });
    }

    fn on_auth_failed(&self, attempt: AttemptId) {
        self.forward(ConnectionEvent::AuthFailed { attempt });
    }

    fn on_state_changed(&self, from: ConnectionState, to: ConnectionState) {
        self.forward(ConnectionEvent::StateChanged { from, to });
    }

    fn on_connection_failed(&self) {
        self.forward(ConnectionEvent::ConnectionFailed);
    }
}
