//! Application configuration and CLI argument parsing
//!
//! This module handles all command-line interface definitions,
//! argument parsing, and translation into a validated run configuration.

use bankload::{LoadConfig, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface definition for BankLoad
#[derive(Parser)]
#[command(name = "bankload")]
#[command(about = "Load generator for the bank management microservices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Available commands for the BankLoad CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Run a load test against the gateway
    Run(RunArgs),

    /// Print the gateway endpoints the tool drives
    Endpoints,
}

/// Arguments of the `run` command
#[derive(Args)]
pub struct RunArgs {
    /// Base URL of the API gateway
    #[arg(long, default_value = "http://localhost:8888")]
    pub gateway: String,

    /// Number of simulated users
    #[arg(short, long, default_value = "10")]
    pub users: usize,

    /// Run duration in seconds
    #[arg(short, long, default_value = "60")]
    pub duration: u64,

    /// Delay between user startups, in milliseconds
    #[arg(long, default_value = "100")]
    pub spawn_interval_ms: u64,

    /// Minimum wait between operations, in milliseconds
    #[arg(long, default_value = "1000")]
    pub wait_min_ms: u64,

    /// Maximum wait between operations, in milliseconds
    #[arg(long, default_value = "3000")]
    pub wait_max_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Login credentials as user:pass; repeat for fallbacks, first wins
    #[arg(long = "login", value_name = "USER:PASS")]
    pub logins: Vec<String>,

    /// HS256 key used to verify login tokens
    #[arg(long)]
    pub token_key: Option<String>,

    /// Currency for created accounts
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Base RNG seed; omit for a random schedule
    #[arg(long)]
    pub seed: Option<u64>,

    /// Port for the Prometheus /metrics endpoint
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Translate the arguments into a validated run configuration.
    pub fn into_config(self) -> Result<LoadConfig> {
        let mut builder = LoadConfig::builder()
            .gateway_url(self.gateway)
            .users(self.users)
            .duration(Duration::from_secs(self.duration))
            .spawn_interval(Duration::from_millis(self.spawn_interval_ms))
            .wait_time(
                Duration::from_millis(self.wait_min_ms),
                Duration::from_millis(self.wait_max_ms),
            )
            .request_timeout(Duration::from_secs(self.timeout))
            .currency(self.currency)
            .metrics_port(self.metrics_port)
            .report_path(self.report);

        for raw in &self.logins {
            let (user, pass) = parse_credentials(raw).map_err(bankload::Error::Config)?;
            builder = builder.credentials(user, pass);
        }
        if let Some(key) = self.token_key {
            builder = builder.token_key(key);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }

        builder.build()
    }
}

/// Parse a `user:pass` credential argument.
pub fn parse_credentials(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once(':') {
        Some((user, pass)) if !user.is_empty() => Ok((user.to_string(), pass.to_string())),
        _ => Err(format!("Invalid credential '{}', expected user:pass", raw)),
    }
}
