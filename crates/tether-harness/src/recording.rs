//! Registry and listener doubles that record what they are told

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tether_core::{AttemptId, AttemptRegistry, ConnectionEvent, ConnectionListener, ConnectionState};

// ----------------------------------------------------------------------------
// Recording Registry
// ----------------------------------------------------------------------------

/// Counts closed notifications per attempt
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    closed: DashMap<AttemptId, u32>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closed_count(&self, attempt: AttemptId) -> u32 {
        self.closed.get(&attempt).map(|count| *count).unwrap_or(0)
    }

    pub fn total_closed(&self) -> u32 {
        self.closed.iter().map(|entry| *entry.value()).sum()
    }
}

impl AttemptRegistry for RecordingRegistry {
    fn notify_closed(&self, attempt: AttemptId) {
        *self.closed.entry(attempt).or_insert(0) += 1;
    }
}

// ----------------------------------------------------------------------------
// Recording Listener
// ----------------------------------------------------------------------------

/// Records every listener notification and answers the policy question
#[derive(Debug)]
pub struct RecordingListener {
    events: Mutex<Vec<ConnectionEvent>>,
    allow_connection: AtomicBool,
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            allow_connection: AtomicBool::new(true),
        }
    }
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer for `is_connection_available`
    pub fn set_allow_connection(&self, allow: bool) {
        self.allow_connection.store(allow, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().clone()
    }

    pub fn failures(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, ConnectionEvent::ConnectionFailed))
            .count()
    }

    /// Target states of every recorded transition, in order
    pub fn transitions(&self) -> Vec<ConnectionState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ConnectionEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, event: ConnectionEvent) {
        self.events.lock().push(event);
    }
}

impl ConnectionListener for RecordingListener {
    fn is_connection_available(&self, _user_request: bool) -> bool {
        self.allow_connection.load(Ordering::SeqCst)
    }

    fn on_srv_resolved(&self, attempt: AttemptId) {
        self.record(ConnectionEvent::SrvResolved { attempt });
    }

    fn on_invalid_certificate(&self, attempt: AttemptId) {
        self.record(ConnectionEvent::InvalidCertificate { attempt });
    }

    fn on_auth_failed(&self, attempt: AttemptId) {
        self.record(ConnectionEvent::AuthFailed { attempt });
    }

    fn on_state_changed(&self, from: ConnectionState, to: ConnectionState) {
        self.record(ConnectionEvent::StateChanged { from, to });
    }

    fn on_connection_failed(&self) {
        self.record(ConnectionEvent::ConnectionFailed);
    }
}
