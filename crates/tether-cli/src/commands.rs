//! Command handlers for the tether CLI

use tracing::info;

use tether_core::ConnectionEvent;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::Result;
use crate::scenario::{Scenario, ScenarioReport, ScenarioRunner};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Simulate { scenario, json } => {
                Self::handle_simulate_command(scenario, json, config).await
            }
            Commands::Scenarios => Self::handle_scenarios_command(),
            Commands::Endpoint => Self::handle_endpoint_command(&config),
            Commands::Check => Self::handle_check_command(&config),
        }
    }

    async fn handle_simulate_command(scenario: Scenario, json: bool, config: AppConfig) -> Result<()> {
        let runner = ScenarioRunner::new(scenario, config)?;
        let report = runner.run().await?;

        if json {
            for event in &report.events {
                println!("{}", serde_json::to_string(event)?);
            }
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print!("{}", Self::render_report(&report));
        }
        Ok(())
    }

    fn handle_scenarios_command() -> Result<()> {
        for scenario in Scenario::all() {
            println!("{:<22} {}", scenario.name(), scenario.description());
        }
        Ok(())
    }

    fn handle_endpoint_command(config: &AppConfig) -> Result<()> {
        let endpoint = config.settings.endpoint(config.reconciler.default_port);
        println!("account:  {}", config.settings.bare_address());
        println!("endpoint: {}", endpoint);
        if config.settings.proxy.kind != tether_core::ProxyType::None {
            println!(
                "proxy:    {} {}:{}",
                config.settings.proxy.kind, config.settings.proxy.host, config.settings.proxy.port
            );
        }
        Ok(())
    }

    fn handle_check_command(config: &AppConfig) -> Result<()> {
        // Profiles are validated on load; re-check for the default profile
        config.validate()?;
        info!(
            account = %config.settings.bare_address(),
            max_redirects = config.reconciler.max_redirects,
            "Profile is valid"
        );
        println!("Profile OK");
        Ok(())
    }

    /// Human-readable report
    pub fn render_report(report: &ScenarioReport) -> String {
        let mut out = format!("Scenario: {}\n", report.scenario);
        for event in &report.events {
            let line = match event {
                ConnectionEvent::StateChanged { from, to } => format!("  {from} -> {to}"),
                ConnectionEvent::SrvResolved { attempt } => format!("  {attempt}: srv resolved"),
                ConnectionEvent::InvalidCertificate { attempt } => {
                    format!("  {attempt}: invalid certificate")
                }
                ConnectionEvent::AuthFailed { attempt } => format!("  {attempt}: auth failed"),
                ConnectionEvent::ConnectionFailed => "  connection failed".to_string(),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&format!("Final state: {}\n", report.final_state));
        if let Some(address) = &report.bound_address {
            out.push_str(&format!("Bound address: {address}\n"));
        }
        out.push_str(&format!(
            "Attempts: {}, teardowns: {}, redirects: {}, stale events: {}, failures: {}\n",
            report.stats.attempts_started,
            report.stats.teardowns_dispatched,
            report.stats.redirects_followed,
            report.stats.stale_events_ignored,
            report.stats.failures_reported,
        ));
        out
    }
}
