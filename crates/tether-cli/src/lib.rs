//! Tether CLI library
//!
//! Components of the `tether` binary: argument parsing, profile loading, and
//! the scenario runner that drives a reconciler against the scripted
//! transport from `tether-harness`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod scenario;

pub use cli::{Cli, Commands};
pub use config::{AppConfig, SimulationConfig};
pub use error::{CliError, Result};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner};
