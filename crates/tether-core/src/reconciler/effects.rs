//! Side effects of a transition
//!
//! Transitions are computed under the reconciler lock and only record what
//! has to happen. The effects are carried out afterwards, in order, with the
//! lock released: listener, registry, shutdown and teardown code never runs
//! while state is held. Attempt creation and start are not effects; they run
//! under the lock (see [`crate::attempt::AttemptFactory`]).

use alloc::sync::Arc;
use alloc::vec::Vec;

use tracing::debug;

use super::ConnectionReconciler;
use crate::attempt::{Attempt, AttemptId};
use crate::state::ConnectionState;

/// Deferred work produced by a transition
pub(crate) enum Effect {
    /// Gracefully close the attempt's session in the background
    Teardown { attempt: Arc<dyn Attempt> },
    /// Release a closed attempt
    Shutdown { attempt: Arc<dyn Attempt> },
    NotifyClosed { attempt: AttemptId },
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    ConnectionFailed,
    SrvResolved { attempt: AttemptId },
    InvalidCertificate { attempt: AttemptId },
    AuthFailed { attempt: AttemptId },
}

/// Ordered list of effects
#[derive(Default)]
pub(crate) struct Effects(Vec<Effect>);

impl Effects {
    pub(crate) fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl ConnectionReconciler {
    /// Carry out effects; must be called without the lock held
    pub(crate) fn apply(&self, effects: Effects) {
        for effect in effects.0 {
            match effect {
                Effect::Teardown { attempt } => self.dispatch_teardown(attempt),
                Effect::Shutdown { attempt } => attempt.shutdown(),
                Effect::NotifyClosed { attempt } => self.registry.notify_closed(attempt),
                Effect::StateChanged { from, to } => self.listener.on_state_changed(from, to),
                Effect::ConnectionFailed => self.listener.on_connection_failed(),
                Effect::SrvResolved { attempt } => self.listener.on_srv_resolved(attempt),
                Effect::InvalidCertificate { attempt } => {
                    self.listener.on_invalid_certificate(attempt)
                }
                Effect::AuthFailed { attempt } => self.listener.on_auth_failed(attempt),
            }
        }
    }

    /// Close the attempt's session on a detached task
    ///
    /// The session is captured now, before any shutdown that follows in the
    /// same effect list can release it. Failures and timeouts are expected
    /// when the session is already broken and are discarded; the state change
    /// arrives separately through the attempt's close callback.
    fn dispatch_teardown(&self, attempt: Arc<dyn Attempt>) {
        let session = attempt.session();
        let attempt_id = attempt.id();
        let connection_id = self.connection_id;
        let timeout = self.config.teardown_timeout();

        self.runtime.spawn(async move {
            // Let the caller finish applying its effects first
            tokio::task::yield_now().await;

            let Some(session) = session else {
                debug!(%connection_id, attempt = %attempt_id, "No session to tear down");
                return;
            };
            match tokio::time::timeout(timeout, session.disconnect()).await {
                Ok(Ok(())) => {
                    debug!(%connection_id, attempt = %attempt_id, "Session torn down");
                }
                Ok(Err(err)) => {
                    debug!(%connection_id, attempt = %attempt_id, error = %err, "Teardown failed, ignoring");
                }
                Err(_) => {
                    debug!(
                        %connection_id,
                        attempt = %attempt_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Teardown timed out, ignoring"
                    );
                }
            }
        });
    }
}
