//! Error handling for the tether CLI

use thiserror::Error;

use tether_core::ConnectionState;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Tether error: {0}")]
    Tether(#[from] tether_core::TetherError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] tether_core::SettingsError),

    #[error("Invalid reconciler configuration: {0}")]
    ReconcilerConfig(#[from] tether_core::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scenario {scenario} stalled waiting for {expected}, state is {actual}")]
    ScenarioStalled {
        scenario: String,
        expected: ConnectionState,
        actual: ConnectionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
