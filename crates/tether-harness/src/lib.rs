//! Tether Harness - test doubles for the connection reconciler
//!
//! Provides everything needed to drive a [`tether_core::ConnectionReconciler`]
//! without a real transport:
//!
//! - **MockAttemptFactory / MockAttempt**: attempts that do nothing on their
//!   own; the test fires callbacks by hand, in any order, from any attempt
//! - **MockSession**: configurable graceful-disconnect outcome (succeed, fail,
//!   hang) with call counting
//! - **ScriptedAttemptFactory**: attempts that play back callback scripts from
//!   their own task on an explicit tokio runtime
//! - **MockNetwork**: switchable network signal
//! - **RecordingRegistry / RecordingListener**: record every notification
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_core::{ConnectionSettings, ConnectionState, ReconcilerBuilder};
//! use tether_harness::{MockAttemptFactory, MockNetwork};
//!
//! #[tokio::test]
//! async fn test_connects() {
//!     let factory = Arc::new(MockAttemptFactory::new());
//!     let reconciler = ReconcilerBuilder::new(ConnectionSettings::new("example.org", "alice"))
//!         .network(Arc::new(MockNetwork::available()))
//!         .attempt_factory(factory.clone())
//!         .build()
//!         .unwrap();
//!
//!     reconciler.reconcile(true);
//!     factory.latest().unwrap().events().connected();
//!     assert_eq!(reconciler.state(), ConnectionState::Authentication);
//! }
//! ```

pub mod mock;
pub mod network;
pub mod recording;
pub mod scripted;

pub use mock::{AttemptCall, DisconnectBehavior, MockAttempt, MockAttemptFactory, MockSession};
pub use network::MockNetwork;
pub use recording::{RecordingListener, RecordingRegistry};
pub use scripted::{AttemptScript, ScriptStep, ScriptedAttempt, ScriptedAttemptFactory, ScriptedSession};
