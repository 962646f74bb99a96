//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{ApiResponse, Transport};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Token-authenticated HTTP transport with a bounded request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !config.api_key.is_empty() {
            let mut token = HeaderValue::from_str(&format!("Token {}", config.api_key))
                .map_err(|_| Error::config("api.api_key contains invalid header characters"))?;
            token.set_sensitive(true);
            headers.insert(AUTHORIZATION, token);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "API response");
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ApiResponse> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<ApiResponse> {
        debug!(url = %url, body = %body, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::read(response).await
    }
}
