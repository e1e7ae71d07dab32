//! Tether CLI profile
//!
//! A profile is a TOML file with three tables:
//!
//! ```toml
//! [settings]
//! server_name = "example.org"
//! user_name = "alice"
//!
//! [reconciler]
//! max_redirects = 5
//!
//! [simulation]
//! step_delay_ms = 50
//! ```
//!
//! Every table is optional and falls back to its defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::{ConnectionSettings, NetworkState, ReconcilerConfig};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------------

/// Complete configuration for the tether CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Account and server the simulated connection uses
    #[serde(default = "default_settings")]
    pub settings: ConnectionSettings,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Timing of the scripted transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay before each scripted transport callback
    pub step_delay_ms: u64,
    /// How long a scenario waits for the reconciler to settle in a state
    pub settle_timeout_ms: u64,
    /// Network signal at startup
    pub initial_network: NetworkState,
}

fn default_settings() -> ConnectionSettings {
    ConnectionSettings::new("localhost", "tether")
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: default_settings(),
            reconciler: ReconcilerConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 25,
            settle_timeout_ms: 5000,
            initial_network: NetworkState::Available,
        }
    }
}

impl SimulationConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

// ----------------------------------------------------------------------------
// Loading And Validation
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load and validate a profile
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        self.reconciler.validate()?;
        if self.simulation.settle_timeout_ms == 0 {
            return Err(CliError::Config(
                "simulation.settle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.simulation.initial_network == NetworkState::Unavailable {
            return Err(CliError::Config(
                "simulation.initial_network must let the first connect through".to_string(),
            ));
        }
        Ok(())
    }
}
