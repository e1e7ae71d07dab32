//! Named connection scenarios
//!
//! Each scenario builds a reconciler against the scripted transport, feeds it
//! user actions and network changes, and waits for it to settle after each
//! step. Listener notifications are collected through a [`ChannelListener`].

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};
use tracing::info;

use tether_core::{
    ChannelListener, ConfigError, ConnectionEvent, ConnectionReconciler, ConnectionState,
    NetworkState, ReconcilerBuilder, ReconcilerStats,
};
use tether_harness::{AttemptScript, MockNetwork, ScriptedAttemptFactory};

use crate::config::AppConfig;
use crate::error::{CliError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Connect and authenticate on the first attempt
    Success,
    /// Create the account on the server before logging in
    Register,
    /// First attempt is refused, the automatic retry connects
    RefusedThenSuccess,
    /// Credentials rejected; the failure reaches the user
    AuthFailure,
    /// Server redirects to another host before login
    Redirect,
    /// Network drops to suppressed and comes back
    NetworkFlap,
    /// Connected session is replaced with a fresh one
    ForceReconnect,
}

impl Scenario {
    pub fn all() -> &'static [Scenario] {
        &[
            Scenario::Success,
            Scenario::Register,
            Scenario::RefusedThenSuccess,
            Scenario::AuthFailure,
            Scenario::Redirect,
            Scenario::NetworkFlap,
            Scenario::ForceReconnect,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Success => "success",
            Scenario::Register => "register",
            Scenario::RefusedThenSuccess => "refused-then-success",
            Scenario::AuthFailure => "auth-failure",
            Scenario::Redirect => "redirect",
            Scenario::NetworkFlap => "network-flap",
            Scenario::ForceReconnect => "force-reconnect",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Success => "connect and authenticate on the first attempt",
            Scenario::Register => "register a new account, then log in",
            Scenario::RefusedThenSuccess => "first attempt refused, retry connects",
            Scenario::AuthFailure => "credentials rejected, user is notified",
            Scenario::Redirect => "server redirects to another host",
            Scenario::NetworkFlap => "network suppressed, then restored",
            Scenario::ForceReconnect => "connected session replaced",
        }
    }

    /// Transport behaviour for consecutive attempts
    fn scripts(&self, config: &AppConfig) -> Vec<AttemptScript> {
        let scripts = match self {
            Scenario::RefusedThenSuccess => vec![AttemptScript::refused(), AttemptScript::success()],
            Scenario::AuthFailure => vec![AttemptScript::auth_failure()],
            Scenario::Redirect => vec![
                AttemptScript::redirect(
                    format!("alt.{}", config.settings.server_name),
                    config.reconciler.default_port,
                ),
                AttemptScript::success(),
            ],
            _ => vec![AttemptScript::success()],
        };
        scripts
            .into_iter()
            .map(|script| script.with_step_delay(config.simulation.step_delay()))
            .collect()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Report
// ----------------------------------------------------------------------------

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub final_state: ConnectionState,
    pub bound_address: Option<String>,
    pub events: Vec<ConnectionEvent>,
    pub stats: ReconcilerStats,
}

impl ScenarioReport {
    pub fn failures(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ConnectionEvent::ConnectionFailed))
            .count()
    }
}

// ----------------------------------------------------------------------------
// Runner
// ----------------------------------------------------------------------------

/// Reconciler wired to a scripted transport and a switchable network
pub struct ScenarioRunner {
    scenario: Scenario,
    config: AppConfig,
    reconciler: Arc<ConnectionReconciler>,
    network: Arc<MockNetwork>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    collected: Vec<ConnectionEvent>,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario, config: AppConfig) -> Result<Self> {
        let (listener, events) = ChannelListener::new();
        let network = Arc::new(MockNetwork::new(config.simulation.initial_network));
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let factory = ScriptedAttemptFactory::new(scenario.scripts(&config), runtime.clone());

        let reconciler = ReconcilerBuilder::new(config.settings.clone())
            .with_config(config.reconciler.clone())
            .network(network.clone())
            .attempt_factory(Arc::new(factory))
            .listener(Arc::new(listener))
            .runtime(runtime)
            .build()?;

        Ok(Self {
            scenario,
            config,
            reconciler,
            network,
            events,
            collected: Vec::new(),
        })
    }

    pub fn reconciler(&self) -> &Arc<ConnectionReconciler> {
        &self.reconciler
    }

    /// Play the scenario to completion
    pub async fn run(mut self) -> Result<ScenarioReport> {
        info!(scenario = %self.scenario, connection_id = %self.reconciler.connection_id(), "Running scenario");

        match self.scenario {
            Scenario::Success | Scenario::Redirect => {
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Connected).await?;
            }
            Scenario::Register => {
                self.reconciler.register_account();
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Connected).await?;
            }
            Scenario::RefusedThenSuccess => {
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Waiting).await?;
                self.reconciler.reconcile(false);
                self.settle(ConnectionState::Connected).await?;
            }
            Scenario::AuthFailure => {
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Waiting).await?;
            }
            Scenario::NetworkFlap => {
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Connected).await?;
                self.network.set(NetworkState::Suppressed);
                self.reconciler.reconcile(false);
                self.settle(ConnectionState::Waiting).await?;
                self.network.set(NetworkState::Available);
                self.reconciler.reconcile(false);
                self.settle(ConnectionState::Connected).await?;
            }
            Scenario::ForceReconnect => {
                self.reconciler.reconcile(true);
                self.settle(ConnectionState::Connected).await?;
                self.reconciler.force_reconnect();
                self.settle(ConnectionState::Connected).await?;
            }
        }

        // Let late callbacks from torn-down sessions land
        sleep(self.config.simulation.step_delay()).await;
        self.drain();

        Ok(ScenarioReport {
            scenario: self.scenario,
            final_state: self.reconciler.state(),
            bound_address: self.reconciler.bound_address(),
            events: self.collected,
            stats: self.reconciler.stats(),
        })
    }

    /// Wait until the reconciler reaches `expected`
    async fn settle(&mut self, expected: ConnectionState) -> Result<()> {
        let reconciler = self.reconciler.clone();
        let reached = timeout(self.config.simulation.settle_timeout(), async move {
            while reconciler.state() != expected {
                sleep(POLL_INTERVAL).await;
            }
        })
        .await;
        self.drain();

        match reached {
            Ok(()) => Ok(()),
            Err(_) => Err(CliError::ScenarioStalled {
                scenario: self.scenario.to_string(),
                expected,
                actual: self.reconciler.state(),
            }),
        }
    }

    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.collected.push(event);
        }
    }
}
