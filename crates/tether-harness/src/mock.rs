//! Mock attempts driven by hand
//!
//! A [`MockAttempt`] does nothing on its own: the test fires its callbacks
//! through [`MockAttempt::events`] in whatever order it wants to simulate,
//! including from a superseded attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

use tether_core::{
    Attempt, AttemptEvents, AttemptFactory, AttemptId, ConnectionSettings, Endpoint, Session,
    TransportError,
};

// ----------------------------------------------------------------------------
// Mock Session
// ----------------------------------------------------------------------------

/// How a mock session reacts to `disconnect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectBehavior {
    Succeed,
    Fail,
    /// Never completes; exercises the teardown timeout
    Hang,
}

/// Session with a configurable disconnect outcome
#[derive(Debug)]
pub struct MockSession {
    bound_address: Option<String>,
    behavior: DisconnectBehavior,
    disconnects: AtomicUsize,
    disconnected: Notify,
}

impl MockSession {
    pub fn new(bound_address: Option<String>, behavior: DisconnectBehavior) -> Self {
        Self {
            bound_address,
            behavior,
            disconnects: AtomicUsize::new(0),
            disconnected: Notify::new(),
        }
    }

    /// Number of times `disconnect` was entered
    pub fn disconnect_calls(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Wait until `disconnect` has been entered at least once
    pub async fn wait_for_disconnect(&self) {
        while self.disconnect_calls() == 0 {
            let notified = self.disconnected.notified();
            if self.disconnect_calls() > 0 {
                break;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.disconnected.notify_waiters();
        match self.behavior {
            DisconnectBehavior::Succeed => Ok(()),
            DisconnectBehavior::Fail => Err(TransportError::DisconnectFailed {
                reason: "stream already broken".to_string(),
            }),
            DisconnectBehavior::Hang => loop {
                sleep(Duration::from_secs(3600)).await;
            },
        }
    }

    fn bound_address(&self) -> Option<String> {
        self.bound_address.clone()
    }
}

// ----------------------------------------------------------------------------
// Mock Attempt
// ----------------------------------------------------------------------------

/// Lifecycle call made on a [`MockAttempt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptCall {
    Start,
    Shutdown,
}

/// Attempt that records what the reconciler asks of it
#[derive(Debug)]
pub struct MockAttempt {
    id: AttemptId,
    events: AttemptEvents,
    started: Mutex<Option<(Endpoint, bool)>>,
    session: Mutex<Option<Arc<MockSession>>>,
    shutdowns: AtomicUsize,
    calls: Mutex<Vec<AttemptCall>>,
}

impl MockAttempt {
    pub fn new(id: AttemptId, events: AttemptEvents) -> Self {
        Self {
            id,
            events,
            started: Mutex::new(None),
            session: Mutex::new(None),
            shutdowns: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Callback handle bound to this attempt
    pub fn events(&self) -> &AttemptEvents {
        &self.events
    }

    /// Endpoint and register flag passed to `start`
    pub fn started_with(&self) -> Option<(Endpoint, bool)> {
        self.started.lock().clone()
    }

    /// Start and shutdown calls in the order they arrived
    pub fn calls(&self) -> Vec<AttemptCall> {
        self.calls.lock().clone()
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn attach_session(&self, session: Arc<MockSession>) {
        *self.session.lock() = Some(session);
    }

    pub fn mock_session(&self) -> Option<Arc<MockSession>> {
        self.session.lock().clone()
    }
}

impl Attempt for MockAttempt {
    fn id(&self) -> AttemptId {
        self.id
    }

    fn start(&self, endpoint: Endpoint, register_account: bool) {
        *self.started.lock() = Some((endpoint, register_account));
        self.calls.lock().push(AttemptCall::Start);
    }

    fn session(&self) -> Option<Arc<dyn Session>> {
        self.session
            .lock()
            .clone()
            .map(|session| session as Arc<dyn Session>)
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(AttemptCall::Shutdown);
    }
}

// ----------------------------------------------------------------------------
// Mock Attempt Factory
// ----------------------------------------------------------------------------

/// Keeps every attempt it creates so tests can drive them
#[derive(Debug)]
pub struct MockAttemptFactory {
    created: Mutex<Vec<Arc<MockAttempt>>>,
    /// Session attached to each new attempt, if any
    session_behavior: Option<DisconnectBehavior>,
    bound_address: Option<String>,
}

impl Default for MockAttemptFactory {
    fn default() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            session_behavior: Some(DisconnectBehavior::Succeed),
            bound_address: None,
        }
    }
}

impl MockAttemptFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts are created without a session
    pub fn without_sessions() -> Self {
        Self {
            session_behavior: None,
            ..Self::default()
        }
    }

    pub fn with_session_behavior(mut self, behavior: DisconnectBehavior) -> Self {
        self.session_behavior = Some(behavior);
        self
    }

    pub fn with_bound_address(mut self, address: impl Into<String>) -> Self {
        self.bound_address = Some(address.into());
        self
    }

    pub fn created(&self) -> Vec<Arc<MockAttempt>> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    pub fn latest(&self) -> Option<Arc<MockAttempt>> {
        self.created.lock().last().cloned()
    }

    pub fn get(&self, id: AttemptId) -> Option<Arc<MockAttempt>> {
        self.created.lock().iter().find(|a| a.id == id).cloned()
    }
}

impl AttemptFactory for MockAttemptFactory {
    fn create(
        &self,
        id: AttemptId,
        events: AttemptEvents,
        _settings: &ConnectionSettings,
    ) -> Arc<dyn Attempt> {
        let attempt = Arc::new(MockAttempt::new(id, events));
        if let Some(behavior) = self.session_behavior {
            attempt.attach_session(Arc::new(MockSession::new(
                self.bound_address.clone(),
                behavior,
            )));
        }
        self.created.lock().push(attempt.clone());
        attempt
    }
}
