//! Tether Core
//!
//! Lifecycle management for a single logical connection to a messaging
//! server. The [`ConnectionReconciler`] decides when to connect, reconnect or
//! disconnect, reconciling the network signal, the user's intent and
//! asynchronous callbacks from transport attempts, while making sure events
//! from a superseded attempt never touch current state.
//!
//! The transport itself, network detection and cross-connection bookkeeping
//! are collaborators behind traits:
//! - [`AttemptFactory`] / [`Attempt`] / [`Session`] for the transport
//! - [`NetworkMonitor`] for network availability
//! - [`AttemptRegistry`] for closed-attempt bookkeeping
//! - [`ConnectionListener`] for policy, extension hooks and failure reporting

extern crate alloc;

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod attempt;
pub mod builder;
pub mod config;
pub mod errors;
pub mod listener;
pub mod network;
pub mod reconciler;
pub mod registry;
pub mod settings;
pub mod state;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use attempt::{Attempt, AttemptEvents, AttemptFactory, AttemptId, Session};
pub use builder::ReconcilerBuilder;
pub use config::{ReconcilerConfig, DEFAULT_CLIENT_PORT};
pub use errors::{ConfigError, SettingsError, TetherError, TetherResult, TransportError};
pub use listener::{ChannelListener, ConnectionEvent, ConnectionListener, NoopListener};
pub use network::{AlwaysAvailable, NetworkMonitor, NetworkState};
pub use reconciler::{ConnectionId, ConnectionReconciler, ReconcilerStats};
pub use registry::{AttemptRegistry, NoopRegistry};
pub use settings::{ConnectionSettings, Endpoint, Protocol, ProxySettings, ProxyType, TlsMode};
pub use state::ConnectionState;
