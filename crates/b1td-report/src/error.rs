//! Error types for b1td-report

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for report operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed time period token
    #[error("Invalid time period '{period}': {reason}")]
    InvalidPeriod { period: String, reason: String },

    /// Insight name outside the fixed catalog
    #[error("{0} report not currently supported")]
    UnsupportedInsight(String),

    /// The API answered with a status outside the success allow-set
    #[error("API returned HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Network, TLS or timeout failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Response(String),

    /// Document or chart could not be produced
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid period error
    pub fn invalid_period(period: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPeriod {
            period: period.into(),
            reason: reason.into(),
        }
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a response shape error
    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }

    /// Whether this error came from talking to the API
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_) | Self::Response(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Render(err.to_string())
    }
}
