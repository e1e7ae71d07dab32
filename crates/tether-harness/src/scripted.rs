//! Scripted attempts
//!
//! Attempts that play back a fixed sequence of transport callbacks from
//! their own tokio task, the way a real transport reports progress from its
//! own context. Used by the CLI simulator and by end-to-end tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::debug;

use tether_core::{
    Attempt, AttemptEvents, AttemptFactory, AttemptId, ConnectionSettings, Endpoint, Session,
    TransportError,
};

// ----------------------------------------------------------------------------
// Scripts
// ----------------------------------------------------------------------------

/// One scripted transport callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    SrvResolved,
    InvalidCertificate,
    /// Stream opened; a session exists from here on
    Connected,
    /// Account registration, only when the attempt was asked to register
    RegisterIfRequested,
    AuthFailed,
    Authorized,
    Closed,
    Redirect { host: String, port: u16, use_srv: bool },
    Pause(Duration),
}

/// Sequence of callbacks played by one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptScript {
    pub steps: Vec<ScriptStep>,
    /// Delay before each step
    pub step_delay: Duration,
}

impl AttemptScript {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            step_delay: Duration::from_millis(10),
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Resolve, connect, (register), authorize, then stay up
    pub fn success() -> Self {
        Self::new(vec![
            ScriptStep::SrvResolved,
            ScriptStep::Connected,
            ScriptStep::RegisterIfRequested,
            ScriptStep::Authorized,
        ])
    }

    /// Server unreachable
    pub fn refused() -> Self {
        Self::new(vec![ScriptStep::SrvResolved, ScriptStep::Closed])
    }

    /// Credentials rejected, then the server drops the stream
    pub fn auth_failure() -> Self {
        Self::new(vec![
            ScriptStep::SrvResolved,
            ScriptStep::Connected,
            ScriptStep::AuthFailed,
            ScriptStep::Closed,
        ])
    }

    /// Server sends the client elsewhere after the stream opens
    pub fn redirect(host: impl Into<String>, port: u16) -> Self {
        Self::new(vec![
            ScriptStep::Connected,
            ScriptStep::Redirect {
                host: host.into(),
                port,
                use_srv: false,
            },
        ])
    }
}

// ----------------------------------------------------------------------------
// Scripted Session
// ----------------------------------------------------------------------------

/// Session whose graceful disconnect reports the close back
///
/// Mirrors a transport that observes its own shutdown and fires the close
/// callback.
#[derive(Debug)]
pub struct ScriptedSession {
    bound_address: String,
    events: AttemptEvents,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn disconnect(&self) -> Result<(), TransportError> {
        self.events.closed();
        Ok(())
    }

    fn bound_address(&self) -> Option<String> {
        Some(self.bound_address.clone())
    }
}

// ----------------------------------------------------------------------------
// Scripted Attempt
// ----------------------------------------------------------------------------

/// Attempt playing an [`AttemptScript`] on its own task
#[derive(Debug)]
pub struct ScriptedAttempt {
    id: AttemptId,
    events: AttemptEvents,
    script: AttemptScript,
    bound_address: String,
    session: Arc<Mutex<Option<Arc<ScriptedSession>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl ScriptedAttempt {
    async fn play(
        script: AttemptScript,
        events: AttemptEvents,
        register_account: bool,
        bound_address: String,
        session: Arc<Mutex<Option<Arc<ScriptedSession>>>>,
    ) {
        for step in script.steps {
            sleep(script.step_delay).await;
            debug!(attempt = %events.attempt(), ?step, "Playing scripted step");
            match step {
                ScriptStep::SrvResolved => events.srv_resolved(),
                ScriptStep::InvalidCertificate => events.invalid_certificate(),
                ScriptStep::Connected => {
                    *session.lock() = Some(Arc::new(ScriptedSession {
                        bound_address: bound_address.clone(),
                        events: events.clone(),
                    }));
                    events.connected();
                }
                ScriptStep::RegisterIfRequested => {
                    if register_account {
                        events.account_registered();
                    }
                }
                ScriptStep::AuthFailed => events.auth_failed(),
                ScriptStep::Authorized => events.authorized(),
                ScriptStep::Closed => {
                    session.lock().take();
                    events.closed();
                }
                ScriptStep::Redirect {
                    host,
                    port,
                    use_srv,
                } => events.see_other_host(host, port, use_srv),
                ScriptStep::Pause(duration) => sleep(duration).await,
            }
        }
    }
}

impl Attempt for ScriptedAttempt {
    fn id(&self) -> AttemptId {
        self.id
    }

    fn start(&self, endpoint: Endpoint, register_account: bool) {
        debug!(attempt = %self.id, %endpoint, register_account, "Scripted attempt starting");
        let handle = self.runtime.spawn(Self::play(
            self.script.clone(),
            self.events.clone(),
            register_account,
            self.bound_address.clone(),
            self.session.clone(),
        ));
        *self.task.lock() = Some(handle);
    }

    fn session(&self) -> Option<Arc<dyn Session>> {
        self.session
            .lock()
            .clone()
            .map(|session| session as Arc<dyn Session>)
    }

    fn shutdown(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.session.lock().take();
    }
}

// ----------------------------------------------------------------------------
// Scripted Attempt Factory
// ----------------------------------------------------------------------------

/// Hands out scripts in order; the last one repeats
///
/// Attempts play on the given runtime, so they can be started from threads
/// outside it.
#[derive(Debug)]
pub struct ScriptedAttemptFactory {
    scripts: Mutex<VecDeque<AttemptScript>>,
    fallback: AttemptScript,
    runtime: Handle,
}

impl ScriptedAttemptFactory {
    pub fn new(scripts: Vec<AttemptScript>, runtime: Handle) -> Self {
        let fallback = scripts.last().cloned().unwrap_or_else(AttemptScript::success);
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback,
            runtime,
        }
    }

    fn next_script(&self) -> AttemptScript {
        self.scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl AttemptFactory for ScriptedAttemptFactory {
    fn create(
        &self,
        id: AttemptId,
        events: AttemptEvents,
        settings: &ConnectionSettings,
    ) -> Arc<dyn Attempt> {
        let resource = if settings.resource.is_empty() {
            "tether"
        } else {
            settings.resource.as_str()
        };
        Arc::new(ScriptedAttempt {
            id,
            events,
            script: self.next_script(),
            bound_address: format!("{}/{}", settings.bare_address(), resource),
            session: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
            runtime: self.runtime.clone(),
        })
    }
}
