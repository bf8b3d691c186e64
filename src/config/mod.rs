//! Load run configuration
//!
//! Everything a run needs to know up front: where the gateway lives, how many
//! simulated users to spawn, how long to run, how users pace themselves, and
//! which credentials they present. Built through a fluent builder and
//! validated before any load is generated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Token verification key shared with the authentication service.
/// Must match the one in the service's application properties.
pub const DEFAULT_TOKEN_KEY: &str = "AaZzBbCcYyDdXxEeWwFf";

/// One username/password pair presented at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Configuration for one load run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Base URL of the API gateway all requests are routed through
    pub gateway_url: String,

    /// Number of simulated users
    pub users: usize,

    /// Delay between consecutive user startups
    pub spawn_interval: Duration,

    /// Total run duration, measured from the first user startup
    pub duration: Duration,

    /// Lower bound of the random wait between operations
    pub wait_min: Duration,

    /// Upper bound of the random wait between operations
    pub wait_max: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Ordered credential sets: the first entry is the primary login,
    /// the rest are fallbacks tried in order
    pub credentials: Vec<Credentials>,

    /// HS256 key used to verify and decode login tokens
    pub token_key: String,

    /// Currency used when creating accounts
    pub currency: String,

    /// Base seed for per-user RNG streams; a fixed seed reproduces the
    /// operation schedule
    pub seed: u64,

    /// Port for the Prometheus exposition endpoint; None disables it
    pub metrics_port: Option<u16>,

    /// Where to write the JSON run report; None prints to the log only
    pub report_path: Option<PathBuf>,

    /// User agent string for HTTP requests
    pub user_agent: String,

    /// Interval between progress log lines
    pub progress_interval: Duration,
}

impl LoadConfig {
    /// Create a new configuration builder
    pub fn builder() -> LoadConfigBuilder {
        LoadConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.gateway_url)
            .map_err(|e| Error::Config(format!("Invalid gateway URL '{}': {}", self.gateway_url, e)))?;

        if self.users == 0 {
            return Err(Error::Config("At least one user is required".to_string()));
        }

        if self.duration.is_zero() {
            return Err(Error::Config("Run duration must be greater than zero".to_string()));
        }

        if self.wait_min > self.wait_max {
            return Err(Error::Config(format!(
                "Wait bounds are inverted: min {:?} > max {:?}",
                self.wait_min, self.wait_max
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.credentials.is_empty() {
            return Err(Error::Config(
                "At least one credential set is required".to_string(),
            ));
        }

        for creds in &self.credentials {
            if creds.username.is_empty() {
                return Err(Error::Config("Credential username is empty".to_string()));
            }
        }

        if self.currency.is_empty() {
            return Err(Error::Config("Currency must not be empty".to_string()));
        }

        Ok(())
    }

    /// Primary login credentials
    pub fn primary_credentials(&self) -> &Credentials {
        &self.credentials[0]
    }

    /// Fallback credential sets, in the order they are tried
    pub fn alternative_credentials(&self) -> &[Credentials] {
        &self.credentials[1..]
    }
}

/// Configuration builder with fluent API
#[derive(Debug, Default)]
pub struct LoadConfigBuilder {
    gateway_url: Option<String>,
    users: Option<usize>,
    spawn_interval: Option<Duration>,
    duration: Option<Duration>,
    wait_min: Option<Duration>,
    wait_max: Option<Duration>,
    request_timeout: Option<Duration>,
    credentials: Vec<Credentials>,
    token_key: Option<String>,
    currency: Option<String>,
    seed: Option<u64>,
    metrics_port: Option<u16>,
    report_path: Option<PathBuf>,
    user_agent: Option<String>,
    progress_interval: Option<Duration>,
}

impl LoadConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gateway base URL
    pub fn gateway_url<S: Into<String>>(mut self, url: S) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Set the number of simulated users
    pub fn users(mut self, users: usize) -> Self {
        self.users = Some(users);
        self
    }

    /// Set the delay between user startups
    pub fn spawn_interval(mut self, interval: Duration) -> Self {
        self.spawn_interval = Some(interval);
        self
    }

    /// Set the run duration
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the wait-time bounds between operations
    pub fn wait_time(mut self, min: Duration, max: Duration) -> Self {
        self.wait_min = Some(min);
        self.wait_max = Some(max);
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Append a credential set; the first one added becomes the primary login
    pub fn credentials<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.credentials.push(Credentials::new(username, password));
        self
    }

    /// Set the token verification key
    pub fn token_key<S: Into<String>>(mut self, key: S) -> Self {
        self.token_key = Some(key.into());
        self
    }

    /// Set the account currency
    pub fn currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Set the base RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable the Prometheus exposition endpoint on the given port
    pub fn metrics_port(mut self, port: Option<u16>) -> Self {
        self.metrics_port = port;
        self
    }

    /// Write the final report as JSON to the given path
    pub fn report_path(mut self, path: Option<PathBuf>) -> Self {
        self.report_path = path;
        self
    }

    /// Set a custom user agent
    pub fn user_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the progress logging interval
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<LoadConfig> {
        let credentials = if self.credentials.is_empty() {
            default_credentials()
        } else {
            self.credentials
        };

        let config = LoadConfig {
            gateway_url: self
                .gateway_url
                .unwrap_or_else(|| "http://localhost:8888".to_string()),
            users: self.users.unwrap_or(10),
            spawn_interval: self.spawn_interval.unwrap_or(Duration::from_millis(100)),
            duration: self.duration.unwrap_or(Duration::from_secs(60)),
            wait_min: self.wait_min.unwrap_or(Duration::from_secs(1)),
            wait_max: self.wait_max.unwrap_or(Duration::from_secs(3)),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
            credentials,
            token_key: self.token_key.unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_string()),
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            seed: self.seed.unwrap_or_else(rand::random),
            metrics_port: self.metrics_port,
            report_path: self.report_path,
            user_agent: self.user_agent.unwrap_or_else(|| {
                format!("BankLoad/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
            }),
            progress_interval: self.progress_interval.unwrap_or(Duration::from_secs(10)),
        };

        config.validate()?;
        Ok(config)
    }
}

/// The credential sets the bank test environment ships with: one primary
/// test user and two fallbacks.
pub fn default_credentials() -> Vec<Credentials> {
    vec![
        Credentials::new("testuser", "testpass123"),
        Credentials::new("admin", "admin"),
        Credentials::new("user", "user"),
    ]
}
