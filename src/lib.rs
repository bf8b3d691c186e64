//! BankLoad - load generator for the bank management microservices
//!
//! Drives the authentication, customer, and account services through the API
//! gateway the way real clients do: each simulated user logs in, decodes its
//! token, resolves or creates a customer and an account, then issues a
//! weighted random mix of queries and credit commands. Throughput and latency
//! are measured per operation and reported at the end of the run.
//!
//! Module map:
//! - config: run configuration (targets, users, pacing, credentials)
//! - gateway: HTTP client, one method per upstream endpoint
//! - auth: login token verification and claims
//! - session: the simulated user (bootstrap + steady-state behavior)
//! - workload: the weighted operation mix and pacing draws
//! - metrics: per-operation statistics, run report, Prometheus exposition
//! - runner: user spawning, deadlines, shutdown, reporting

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod runner;
pub mod session;
pub mod workload;

// Re-export commonly used types for easy access
pub use config::{Credentials, LoadConfig, LoadConfigBuilder, DEFAULT_TOKEN_KEY};
pub use error::{Error, Result};
pub use gateway::{ApiResponse, GatewayClient};
pub use metrics::{MetricsRegistry, RunReport};
pub use runner::LoadRunner;
pub use session::{SessionState, UserSession};
pub use workload::Operation;
