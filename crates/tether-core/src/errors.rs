//! Error types for tether
//!
//! Reconciliation itself never fails: network absence, stale callbacks and
//! teardown failures all drive silent state transitions. The errors here cover
//! the edges around it: invalid settings, invalid configuration, a transport
//! refusing to shut down cleanly, and an incomplete builder.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised by a transport session
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Disconnect failed: {reason}")]
    DisconnectFailed { reason: String },
    #[error("Disconnect timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("Session already closed")]
    AlreadyClosed,
    #[error("Network I/O error: {0}")]
    NetworkIo(#[from] std::io::Error),
}

/// Connection settings validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Server name must not be empty")]
    EmptyServerName,
    #[error("Custom host is enabled but no host is set")]
    EmptyCustomHost,
    #[error("Invalid port {port} for {context}")]
    InvalidPort { context: &'static str, port: u16 },
    #[error("Proxy {kind} requires a proxy host")]
    EmptyProxyHost { kind: String },
}

/// Reconciler configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("No tokio runtime available to run teardown tasks")]
    NoRuntime,
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Unified error type for tether
#[derive(Debug, Error)]
pub enum TetherError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Missing collaborator: {name}")]
    MissingCollaborator { name: &'static str },
}

pub type TetherResult<T> = Result<T, TetherError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
