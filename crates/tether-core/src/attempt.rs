//! Transport attempt boundary
//!
//! An attempt is one pass of connect, (optionally) register, authenticate,
//! until it fails or is superseded. Attempts run on their own execution
//! context and report back through [`AttemptEvents`], which tags every
//! callback with the attempt's identity so the reconciler can discard events
//! from attempts it no longer tracks.

use alloc::sync::{Arc, Weak};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::reconciler::ConnectionReconciler;
use crate::settings::{ConnectionSettings, Endpoint};

// ----------------------------------------------------------------------------
// Attempt Identity
// ----------------------------------------------------------------------------

static NEXT_ATTEMPT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        Self(NEXT_ATTEMPT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt#{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Transport Traits
// ----------------------------------------------------------------------------

/// An established network session
#[async_trait]
pub trait Session: Send + Sync {
    /// Gracefully close the session
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Full address assigned by the server at login
    fn bound_address(&self) -> Option<String>;
}

/// One connection attempt
pub trait Attempt: Send + Sync {
    fn id(&self) -> AttemptId;

    /// Begin connecting; must hand the work to the attempt's own context and
    /// return immediately
    ///
    /// Called with the reconciler's lock held. Callbacks must be fired from
    /// the attempt's own context, never from inside `start`.
    fn start(&self, endpoint: Endpoint, register_account: bool);

    /// The network session, once one exists
    fn session(&self) -> Option<Arc<dyn Session>>;

    /// Release resources after a managed close
    fn shutdown(&self);
}

/// Creates attempts for a reconciler
///
/// `create` runs with the reconciler's lock held: it must not call back into
/// the reconciler, and the returned attempt must not fire callbacks before
/// `start` hands work to its own context.
pub trait AttemptFactory: Send + Sync {
    fn create(
        &self,
        id: AttemptId,
        events: AttemptEvents,
        settings: &ConnectionSettings,
    ) -> Arc<dyn Attempt>;
}

// ----------------------------------------------------------------------------
// Attempt Events
// ----------------------------------------------------------------------------

/// Callback handle given to each attempt
///
/// Holds only a weak reference, so an attempt outliving its reconciler
/// reports into the void.
#[derive(Clone)]
pub struct AttemptEvents {
    attempt: AttemptId,
    reconciler: Weak<ConnectionReconciler>,
}

impl AttemptEvents {
    pub(crate) fn new(attempt: AttemptId, reconciler: Weak<ConnectionReconciler>) -> Self {
        Self {
            attempt,
            reconciler,
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    fn with(&self, f: impl FnOnce(&ConnectionReconciler, AttemptId)) {
        if let Some(reconciler) = self.reconciler.upgrade() {
            f(&reconciler, self.attempt);
        }
    }

    pub fn srv_resolved(&self) {
        self.with(|r, id| r.on_srv_resolved(id));
    }

    pub fn invalid_certificate(&self) {
        self.with(|r, id| r.on_invalid_certificate(id));
    }

    pub fn connected(&self) {
        self.with(|r, id| r.on_connected(id));
    }

    pub fn account_registered(&self) {
        self.with(|r, id| r.on_account_registered(id));
    }

    pub fn auth_failed(&self) {
        self.with(|r, id| r.on_auth_failed(id));
    }

    pub fn authorized(&self) {
        self.with(|r, id| r.on_authorized(id));
    }

    pub fn closed(&self) {
        self.with(|r, id| r.on_close(id));
    }

    pub fn see_other_host(&self, host: impl Into<String>, port: u16, use_srv: bool) {
        let endpoint = Endpoint::new(host, port, use_srv);
        self.with(|r, id| r.on_see_other_host(id, endpoint));
    }
}

impl fmt::Debug for AttemptEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptEvents")
            .field("attempt", &self.attempt)
            .field("reconciler_alive", &(self.reconciler.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_ids_are_unique_and_increasing() {
        let first = AttemptId::next();
        let second = AttemptId::next();

        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_events_without_reconciler_are_inert() {
        let events = AttemptEvents::new(AttemptId::next(), Weak::new());

        events.connected();
        events.authorized();
        events.closed();
        events.see_other_host("other.example.org", 5222, false);
    }
}
