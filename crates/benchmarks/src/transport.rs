//! HTTP transport used by the timed loop.
//!
//! [`QueryTransport`] is the seam between the loop and the network. The
//! production implementation, [`HttpTransport`], wraps one pooled
//! `reqwest::Client` that lives exactly as long as the run.

use async_trait::async_trait;
use bytes::Bytes;
use querybench_core::{BenchError, Headers, PreparedRequest, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// Status and fully drained body of a response.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// HTTP status code
    pub status: u16,
    /// Complete response body
    pub body: Bytes,
}

impl QueryResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one prepared request and drains its response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Send `request`, wait for the response and read its body to the end.
    async fn execute(&self, request: &PreparedRequest) -> Result<QueryResponse>;
}

/// Client settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Overall timeout per request, body included
    pub timeout: Duration,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("querybench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `reqwest`-backed transport with connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Build the client and validate `headers`.
    pub fn new(config: &TransportConfig, headers: &Headers) -> Result<Self> {
        let headers = header_map(headers)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                BenchError::RequestConstruction(format!("failed to build HTTP client: {}", e))
            })?;

        debug!(
            timeout_ms = config.timeout.as_millis() as u64,
            headers = headers.len(),
            "HTTP transport ready"
        );

        Ok(Self { client, headers })
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<QueryResponse> {
        let response = self
            .client
            .get(request.url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(QueryResponse { status, body })
    }
}

/// Convert [`Headers`] into a validated header map.
pub fn header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            BenchError::RequestConstruction(format!("invalid header name '{}': {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            BenchError::RequestConstruction(format!("invalid value for header '{}': {}", name, e))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn transport_error(err: reqwest::Error) -> BenchError {
    BenchError::Transport {
        timed_out: err.is_timeout(),
        message: err.to_string(),
    }
}
