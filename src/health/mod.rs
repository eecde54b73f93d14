// ABOUTME: Readiness gate that blocks rollout completion until a workload is healthy.
// ABOUTME: Polls an HTTP endpoint until enough consecutive successes, or cancellation.

mod transport;

pub use transport::{HealthTransport, HttpTransport, TransportError};

use crate::spec::ServiceSpec;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("readiness wait cancelled")]
    Cancelled,

    #[error("not ready within {}s", .0.as_secs())]
    Timeout(Duration),

    /// The health check can never succeed as configured.
    #[error(transparent)]
    Misconfigured(TransportError),
}

/// Blocks until the workload described by `spec` is ready.
#[async_trait]
pub trait ReadinessGate: Send + Sync {
    async fn wait(&self, spec: &ServiceSpec, cancel: &CancellationToken)
    -> Result<(), ReadinessError>;
}

/// Polls `healthCheck.url` on `healthCheck.interval`.
///
/// A 2xx or 3xx answer within the per-attempt timeout counts as a success.
/// Anything else resets the streak to zero. There is no attempt limit: an
/// unhealthy workload blocks until the caller cancels or imposes a timeout.
/// Specs without an HTTP check pass immediately.
pub struct HttpReadinessGate {
    transport: Arc<dyn HealthTransport>,
    span: tracing::Span,
}

impl HttpReadinessGate {
    pub fn new(transport: Arc<dyn HealthTransport>) -> Self {
        Self {
            transport,
            span: tracing::info_span!("readiness"),
        }
    }

    /// Gate using the built-in HTTP/HTTPS transport.
    pub fn http() -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    async fn poll(
        &self,
        spec: &ServiceSpec,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ReadinessError> {
        let check = &spec.health_check;
        let threshold = check.healthy_threshold.max(1);
        let mut streak = 0u32;

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
                res = self.transport.get(url, check.timeout) => res,
            };

            match attempt {
                Ok(code) if (200..400).contains(&code) => {
                    streak += 1;
                    tracing::debug!(code, streak, threshold, "health check passed");
                }
                Ok(code) => {
                    streak = 0;
                    tracing::debug!(code, "health check failed");
                }
                Err(e) if e.is_permanent() => return Err(ReadinessError::Misconfigured(e)),
                Err(e) => {
                    streak = 0;
                    tracing::debug!(error = %e, "health check failed");
                }
            }

            if streak >= threshold {
                tracing::info!(service = %spec.name, "ready");
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
                _ = tokio::time::sleep(check.interval) => {}
            }
        }
    }
}

#[async_trait]
impl ReadinessGate for HttpReadinessGate {
    async fn wait(
        &self,
        spec: &ServiceSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ReadinessError> {
        let Some(url) = spec.health_check.http_url() else {
            return Ok(());
        };
        let span = tracing::info_span!(parent: &self.span, "wait", service = %spec.name, %url);
        self.poll(spec, url, cancel).instrument(span).await
    }
}
