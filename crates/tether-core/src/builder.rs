//! Reconciler Builder API
//!
//! Collects settings, configuration and boundary implementations, validates
//! them, and produces a shared [`ConnectionReconciler`].

use alloc::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use crate::attempt::AttemptFactory;
use crate::config::ReconcilerConfig;
use crate::errors::{ConfigError, TetherError, TetherResult};
use crate::listener::{ConnectionListener, NoopListener};
use crate::network::NetworkMonitor;
use crate::reconciler::{Collaborators, ConnectionReconciler};
use crate::registry::{AttemptRegistry, NoopRegistry};
use crate::settings::ConnectionSettings;

/// Builder for a connection reconciler
pub struct ReconcilerBuilder {
    settings: ConnectionSettings,
    config: ReconcilerConfig,
    network: Option<Arc<dyn NetworkMonitor>>,
    factory: Option<Arc<dyn AttemptFactory>>,
    registry: Arc<dyn AttemptRegistry>,
    listener: Arc<dyn ConnectionListener>,
    runtime: Option<Handle>,
    register_account: bool,
}

impl ReconcilerBuilder {
    /// Create a new builder for the given settings
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            config: ReconcilerConfig::default(),
            network: None,
            factory: None,
            registry: Arc::new(NoopRegistry),
            listener: Arc::new(NoopListener),
            runtime: None,
            register_account: false,
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the shared network monitor (required)
    pub fn network(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Set the attempt factory (required)
    pub fn attempt_factory(mut self, factory: Arc<dyn AttemptFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn AttemptRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ConnectionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Run teardown tasks on this runtime instead of the ambient one
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Register a new account with the first attempt
    pub fn register_account(mut self, register: bool) -> Self {
        self.register_account = register;
        self
    }

    pub fn build(self) -> TetherResult<Arc<ConnectionReconciler>> {
        self.settings.validate()?;
        self.config.validate()?;

        let network = self
            .network
            .ok_or(TetherError::MissingCollaborator { name: "network monitor" })?;
        let factory = self
            .factory
            .ok_or(TetherError::MissingCollaborator { name: "attempt factory" })?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };

        let reconciler = ConnectionReconciler::new(
            self.settings,
            Collaborators {
                network,
                registry: self.registry,
                factory,
                listener: self.listener,
            },
            self.config,
            runtime,
            self.register_account,
        );
        info!(
            connection_id = %reconciler.connection_id(),
            address = %reconciler.settings().bare_address(),
            "Reconciler created"
        );
        Ok(reconciler)
    }
}
