//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Profile path (tether.toml)
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive a reconciler through a scripted connection scenario
    Simulate {
        /// Scenario to run
        #[arg(value_enum, default_value_t = Scenario::Success)]
        scenario: Scenario,
        /// Print events and the final report as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List the available scenarios
    Scenarios,
    /// Show the endpoint the profile's settings resolve to
    Endpoint,
    /// Validate the profile and exit
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from(["tether", "-v", "simulate", "network-flap", "--json"])
            .expect("Arguments should parse");

        assert!(cli.verbose);
        match cli.command {
            Commands::Simulate { scenario, json } => {
                assert_eq!(scenario, Scenario::NetworkFlap);
                assert!(json);
            }
            _ => panic!("Expected simulate command"),
        }
    }

    #[test]
    fn test_simulate_defaults_to_success() {
        let cli = Cli::try_parse_from(["tether", "simulate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Simulate {
                scenario: Scenario::Success,
                json: false
            }
        ));
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        assert!(Cli::try_parse_from(["tether", "simulate", "teleport"]).is_err());
    }
}
