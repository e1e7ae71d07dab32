//! Connection reconciler
//!
//! Owns the lifecycle of one logical connection. Three independent signals
//! meet here: the network monitor, the user's intent, and callbacks from
//! attempts running on their own execution context. [`ConnectionReconciler::reconcile`]
//! derives the desired state from the first two; the `on_*` hooks fold in the
//! third.
//!
//! # Concurrency
//!
//! State, the current attempt and the policy flags live together behind one
//! mutex. Every entry point computes its transition under the lock, collects
//! the resulting side effects, and applies them after unlocking. The one
//! exception is creating and starting an attempt, which happens under the
//! lock so that start is always ordered before any teardown of the same
//! attempt. Attempt callbacks are checked against the current attempt's
//! identity before they may touch state; a superseded attempt's callbacks
//! only reach the registry.

mod effects;

use alloc::sync::{Arc, Weak};
use core::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use self::effects::{Effect, Effects};
use crate::attempt::{Attempt, AttemptEvents, AttemptFactory, AttemptId};
use crate::config::ReconcilerConfig;
use crate::listener::ConnectionListener;
use crate::network::{NetworkMonitor, NetworkState};
use crate::registry::AttemptRegistry;
use crate::settings::{ConnectionSettings, Endpoint};
use crate::state::ConnectionState;

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Identity of a reconciler, carried in every log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counters for a reconciler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerStats {
    /// Attempts created, including redirects
    pub attempts_started: u64,
    /// Background teardowns spawned
    pub teardowns_dispatched: u64,
    /// See-other-host redirects followed
    pub redirects_followed: u64,
    /// Callbacks dropped because their attempt was superseded
    pub stale_events_ignored: u64,
    /// User-visible connection failures raised
    pub failures_reported: u64,
}

/// External signals sampled once per entry point
#[derive(Debug, Clone, Copy)]
struct Inputs {
    network: NetworkState,
    policy_allows: bool,
}

struct Inner {
    settings: ConnectionSettings,
    state: ConnectionState,
    attempt: Option<Arc<dyn Attempt>>,
    /// The latest connect was an explicit user action
    user_requested: bool,
    /// Forced teardown in progress; overrides the network signal
    disconnection_requested: bool,
    /// Next attempts create the account before authenticating
    register_new_account: bool,
    /// Redirects followed in the current connect cycle
    redirects: u32,
    stats: ReconcilerStats,
}

impl Inner {
    fn is_managed(&self, attempt: AttemptId) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.id() == attempt)
    }
}

/// Boundary implementations handed to a reconciler
pub(crate) struct Collaborators {
    pub(crate) network: Arc<dyn NetworkMonitor>,
    pub(crate) registry: Arc<dyn AttemptRegistry>,
    pub(crate) factory: Arc<dyn AttemptFactory>,
    pub(crate) listener: Arc<dyn ConnectionListener>,
}

// ----------------------------------------------------------------------------
// Connection Reconciler
// ----------------------------------------------------------------------------

/// Decides when to connect, reconnect or disconnect one logical connection
pub struct ConnectionReconciler {
    connection_id: ConnectionId,
    inner: Mutex<Inner>,
    network: Arc<dyn NetworkMonitor>,
    registry: Arc<dyn AttemptRegistry>,
    factory: Arc<dyn AttemptFactory>,
    listener: Arc<dyn ConnectionListener>,
    config: ReconcilerConfig,
    runtime: Handle,
    this: Weak<ConnectionReconciler>,
}

impl ConnectionReconciler {
    pub(crate) fn new(
        settings: ConnectionSettings,
        collaborators: Collaborators,
        config: ReconcilerConfig,
        runtime: Handle,
        register_new_account: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            connection_id: ConnectionId::new(),
            inner: Mutex::new(Inner {
                settings,
                state: ConnectionState::Offline,
                attempt: None,
                user_requested: false,
                disconnection_requested: false,
                register_new_account,
                redirects: 0,
                stats: ReconcilerStats::default(),
            }),
            network: collaborators.network,
            registry: collaborators.registry,
            factory: collaborators.factory,
            listener: collaborators.listener,
            config,
            runtime,
            this: this.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn settings(&self) -> ConnectionSettings {
        self.inner.lock().settings.clone()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Identity of the attempt currently tracked, if any
    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.inner.lock().attempt.as_ref().map(|a| a.id())
    }

    pub fn is_user_requested(&self) -> bool {
        self.inner.lock().user_requested
    }

    pub fn stats(&self) -> ReconcilerStats {
        self.inner.lock().stats.clone()
    }

    /// Create the account on the server during the next attempts
    pub fn register_account(&self) {
        self.inner.lock().register_new_account = true;
    }

    pub fn is_register_account(&self) -> bool {
        self.inner.lock().register_new_account
    }

    /// Full address the server bound at login
    ///
    /// `None` when there is no attempt, no session yet, or nothing bound.
    pub fn bound_address(&self) -> Option<String> {
        let attempt = self.inner.lock().attempt.clone()?;
        attempt.session()?.bound_address()
    }

    /// Credential change; leaves state and the current attempt alone
    pub fn on_password_changed(&self, password: impl Into<String>) {
        self.inner.lock().settings.set_password(password);
        debug!(connection_id = %self.connection_id, "Password updated");
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Connect or disconnect according to the network signal and flags
    ///
    /// Returns whether the state changed. Never blocks on the network:
    /// starting an attempt and tearing one down are both handed off.
    pub fn reconcile(&self, user_request: bool) -> bool {
        let inputs = self.sample_inputs(user_request);
        let mut effects = Effects::default();
        let changed = {
            let mut inner = self.inner.lock();
            self.reconcile_locked(&mut inner, inputs, user_request, &mut effects)
        };
        self.apply(effects);
        changed
    }

    /// Replace the current attempt with a fresh one
    ///
    /// No-op from `offline`. Both passes run under one lock hold, and the
    /// user-requested flag is preserved across the restart.
    pub fn force_reconnect(&self) {
        let inputs = self.sample_inputs(false);
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            if !inner.state.is_connectable() {
                return;
            }
            info!(connection_id = %self.connection_id, state = %inner.state, "Forcing reconnect");

            inner.disconnection_requested = true;
            let user_requested = inner.user_requested;
            inner.user_requested = false;
            self.reconcile_locked(&mut inner, inputs, false, &mut effects);

            inner.user_requested = user_requested;
            inner.disconnection_requested = false;
            self.reconcile_locked(&mut inner, inputs, false, &mut effects);
        }
        self.apply(effects);
    }

    fn sample_inputs(&self, user_request: bool) -> Inputs {
        Inputs {
            network: self.network.state(),
            policy_allows: self.listener.is_connection_available(user_request),
        }
    }

    fn reconcile_locked(
        &self,
        inner: &mut Inner,
        inputs: Inputs,
        user_request: bool,
        effects: &mut Effects,
    ) -> bool {
        let network_ok = inputs.network == NetworkState::Available
            && inputs.policy_allows
            && !inner.disconnection_requested;

        if network_ok {
            if !matches!(inner.state, ConnectionState::Offline | ConnectionState::Waiting) {
                return false;
            }
            if user_request {
                inner.user_requested = true;
            }
            inner.redirects = 0;
            let endpoint = inner.settings.endpoint(self.config.default_port);
            self.set_state(inner, ConnectionState::Connecting, effects);
            self.start_attempt(inner, endpoint);
            return true;
        }

        let suppressed = inputs.network == NetworkState::Suppressed || inner.disconnection_requested;
        let target = if inputs.policy_allows && suppressed {
            ConnectionState::Waiting
        } else {
            ConnectionState::Offline
        };

        if inner.state.is_active() {
            if user_request {
                inner.user_requested = false;
            }
            if let Some(attempt) = inner.attempt.take() {
                inner.stats.teardowns_dispatched += 1;
                effects.push(Effect::Teardown {
                    attempt: attempt.clone(),
                });
                self.close_managed(inner, attempt, effects);
            }
        } else if inner.state == target {
            return false;
        }
        self.set_state(inner, target, effects);
        true
    }

    // ------------------------------------------------------------------
    // Attempt Lifecycle
    // ------------------------------------------------------------------

    fn start_attempt(&self, inner: &mut Inner, endpoint: Endpoint) {
        let id = AttemptId::next();
        let events = AttemptEvents::new(id, self.this.clone());
        let attempt = self.factory.create(id, events, &inner.settings);

        info!(
            connection_id = %self.connection_id,
            attempt = %id,
            endpoint = %endpoint,
            register = inner.register_new_account,
            "Starting attempt"
        );
        // Started under the lock so no teardown can reach it first
        attempt.start(endpoint, inner.register_new_account);
        inner.attempt = Some(attempt);
        inner.stats.attempts_started += 1;
    }

    /// Bookkeeping for an attempt that was current when it closed
    ///
    /// The caller has already cleared the attempt pointer and decides the
    /// next state.
    fn close_managed(&self, inner: &mut Inner, attempt: Arc<dyn Attempt>, effects: &mut Effects) {
        effects.push(Effect::NotifyClosed {
            attempt: attempt.id(),
        });
        effects.push(Effect::Shutdown { attempt });

        if inner.user_requested && inner.state != ConnectionState::Connected {
            inner.stats.failures_reported += 1;
            effects.push(Effect::ConnectionFailed);
        }
        inner.user_requested = false;
    }

    fn set_state(&self, inner: &mut Inner, to: ConnectionState, effects: &mut Effects) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        info!(connection_id = %self.connection_id, %from, %to, "State changed");
        effects.push(Effect::StateChanged { from, to });
    }

    fn ignore_stale(&self, inner: &mut Inner, attempt: AttemptId, event: &'static str) {
        inner.stats.stale_events_ignored += 1;
        debug!(
            connection_id = %self.connection_id,
            attempt = %attempt,
            event,
            "Ignoring event from superseded attempt"
        );
    }

    /// Lock, run a managed-only transition, unlock, apply
    fn on_managed(
        &self,
        attempt: AttemptId,
        event: &'static str,
        transition: impl FnOnce(&mut Inner, &mut Effects),
    ) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            if inner.is_managed(attempt) {
                transition(&mut *inner, &mut effects);
            } else {
                self.ignore_stale(&mut inner, attempt, event);
            }
        }
        self.apply(effects);
    }

    // ------------------------------------------------------------------
    // Event Hooks
    // ------------------------------------------------------------------

    pub fn on_srv_resolved(&self, attempt: AttemptId) {
        self.on_managed(attempt, "srv_resolved", |_, effects| {
            effects.push(Effect::SrvResolved { attempt });
        });
    }

    /// Surfaced to the listener only; the state is left alone
    pub fn on_invalid_certificate(&self, attempt: AttemptId) {
        self.on_managed(attempt, "invalid_certificate", |_, effects| {
            effects.push(Effect::InvalidCertificate { attempt });
        });
    }

    pub fn on_connected(&self, attempt: AttemptId) {
        self.on_managed(attempt, "connected", |inner, effects| {
            let next = if inner.register_new_account {
                ConnectionState::Registration
            } else {
                ConnectionState::Authentication
            };
            self.set_state(inner, next, effects);
        });
    }

    /// Clears the register flag even for a superseded attempt: the account
    /// exists on the server either way
    pub fn on_account_registered(&self, attempt: AttemptId) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            inner.register_new_account = false;
            if inner.is_managed(attempt) {
                self.set_state(&mut inner, ConnectionState::Authentication, &mut effects);
            } else {
                self.ignore_stale(&mut inner, attempt, "account_registered");
            }
        }
        self.apply(effects);
    }

    /// Surfaced to the listener, which decides whether to tear down
    pub fn on_auth_failed(&self, attempt: AttemptId) {
        self.on_managed(attempt, "auth_failed", |_, effects| {
            effects.push(Effect::AuthFailed { attempt });
        });
    }

    pub fn on_authorized(&self, attempt: AttemptId) {
        self.on_managed(attempt, "authorized", |inner, effects| {
            self.set_state(inner, ConnectionState::Connected, effects);
        });
    }

    /// The attempt's session closed, for whatever reason
    pub fn on_close(&self, attempt: AttemptId) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            if let Some(current) = self.take_if_managed(&mut inner, attempt) {
                info!(connection_id = %self.connection_id, attempt = %attempt, "Attempt closed");
                self.close_managed(&mut inner, current, &mut effects);
                self.set_state(&mut inner, ConnectionState::Waiting, &mut effects);
            } else {
                effects.push(Effect::NotifyClosed { attempt });
                self.ignore_stale(&mut inner, attempt, "close");
            }
        }
        self.apply(effects);
    }

    /// The server asked to reconnect elsewhere
    ///
    /// Follows at most `max_redirects` redirects per connect cycle; past that
    /// the attempt is treated as closed.
    pub fn on_see_other_host(&self, attempt: AttemptId, endpoint: Endpoint) {
        let mut effects = Effects::default();
        {
            let mut inner = self.inner.lock();
            match self.take_if_managed(&mut inner, attempt) {
                None => {
                    effects.push(Effect::NotifyClosed { attempt });
                    self.ignore_stale(&mut inner, attempt, "see_other_host");
                }
                Some(current) if inner.redirects >= self.config.max_redirects => {
                    warn!(
                        connection_id = %self.connection_id,
                        attempt = %attempt,
                        endpoint = %endpoint,
                        max_redirects = self.config.max_redirects,
                        "Redirect limit reached, giving up on attempt"
                    );
                    self.close_managed(&mut inner, current, &mut effects);
                    self.set_state(&mut inner, ConnectionState::Waiting, &mut effects);
                }
                Some(current) => {
                    info!(
                        connection_id = %self.connection_id,
                        attempt = %attempt,
                        endpoint = %endpoint,
                        "Following redirect"
                    );
                    effects.push(Effect::NotifyClosed { attempt });
                    effects.push(Effect::Shutdown { attempt: current });
                    inner.redirects += 1;
                    inner.stats.redirects_followed += 1;
                    self.set_state(&mut inner, ConnectionState::Connecting, &mut effects);
                    self.start_attempt(&mut inner, endpoint);
                }
            }
        }
        self.apply(effects);
    }

    fn take_if_managed(&self, inner: &mut Inner, attempt: AttemptId) -> Option<Arc<dyn Attempt>> {
        if inner.is_managed(attempt) {
            inner.attempt.take()
        } else {
            None
        }
    }
}

impl fmt::Debug for ConnectionReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConnectionReconciler")
            .field("connection_id", &self.connection_id)
            .field("state", &inner.state)
            .field("attempt", &inner.attempt.as_ref().map(|a| a.id()))
            .field("user_requested", &inner.user_requested)
            .field("register_new_account", &inner.register_new_account)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
