//! HTTP transport.
//!
//! The [`Transport`] trait is the network boundary: sessions only ever see
//! decoded JSON or a [`FetchError`]. The real implementation wraps
//! `reqwest`; tests and offline mode use [`crate::fetch::MockTransport`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::error::FetchError;
use super::key::RequestConfig;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An HTTP-capable transport producing decoded JSON payloads.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and decode the response body as JSON.
    ///
    /// Non-success statuses and undecodable bodies are errors; there is
    /// no retry at this layer.
    async fn execute(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<serde_json::Value, FetchError>;
}

/// Configuration for the reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl HttpTransportConfig {
    /// Create a config with the default timeout.
    pub fn new() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<serde_json::Value, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Network(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Network(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let mut request = self
            .http
            .request(config.method.clone(), url)
            .headers(headers);

        if let Some(body) = &config.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
