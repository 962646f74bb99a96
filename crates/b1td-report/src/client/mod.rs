//! API access
//!
//! [`Transport`] is the seam to the network: one authenticated request in,
//! status and body out. [`ReportingClient`] composes a transport with the TI
//! reports endpoints and the insight catalog.

mod http;
mod reporting;

pub use http::HttpTransport;
pub use reporting::{Endpoints, ReportingClient, DNS_EVENT_SOURCES};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Status codes treated as success
pub const RETURN_CODES_OK: [u16; 3] = [200, 201, 204];

/// Status and raw body of an API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl ApiResponse {
    /// Response with `status` and `body`
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the success allow-set
    pub fn is_ok(&self) -> bool {
        RETURN_CODES_OK.contains(&self.status)
    }

    /// Raw body text
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parsed JSON body for a successful response, [`Error::Transport`] otherwise.
    ///
    /// An empty successful body (204) is returned as `{}`.
    pub fn into_json(self) -> Result<Value> {
        if !self.is_ok() {
            return Err(Error::Transport {
                status: self.status,
                body: self.body,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        self.json()
    }
}

/// Authenticated request/response transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`
    async fn get(&self, url: &str) -> Result<ApiResponse>;

    /// POST `body` as JSON to `url`
    async fn post(&self, url: &str, body: &Value) -> Result<ApiResponse>;
}
