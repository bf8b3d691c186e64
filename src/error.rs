//! Error types and handling for BankLoad

use thiserror::Error;

/// Result type alias for BankLoad operations
pub type Result<T> = std::result::Result<T, Error>;

/// BankLoad error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Token error: {0}")]
    Token(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timeout: {operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout {
                operation: "HTTP request".to_string(),
                duration_ms: 0,
            }
        } else if err.is_connect() {
            Error::Network(format!("Connection failed: {}", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("Invalid URL: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Token(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl Error {
    /// True for failures caused by the upstream services or the network,
    /// i.e. failures that are recorded and survived rather than aborting
    /// the run.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Api { .. } | Error::Timeout { .. } | Error::Token(_)
        )
    }
}
