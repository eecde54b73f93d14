// ABOUTME: Bounded HTTP GET used by the readiness gate.
// ABOUTME: reqwest client with rustls, so both http and https health URLs work.

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid health check url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported health check scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("build http client: {0}")]
    Client(String),

    #[error("connect: {0}")]
    Connect(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl TransportError {
    /// Errors that no amount of retrying will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TransportError::InvalidUrl { .. }
                | TransportError::UnsupportedScheme(_)
                | TransportError::Client(_)
        )
    }
}

/// A single bounded HTTP GET returning the response status code.
#[async_trait]
pub trait HealthTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, TransportError>;
}

/// HTTP/HTTPS client shared across all health checks.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rollkeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let target = parse_target(url)?;
        let resp = self
            .client
            .get(target)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        Ok(resp.status().as_u16())
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Http(err.to_string())
    }
}

/// Parse `url`, accepting only http and https.
fn parse_target(url: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}
