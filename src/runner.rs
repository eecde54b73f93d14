// ABOUTME: Periodic scheduling loop that reconciles every declared service in turn.
// ABOUTME: Per-service failures are logged and isolated; cancellation ends the loop cleanly.

use crate::deploy::{DeployError, ReconcileOutcome, Reconciler};
use crate::error::{Error, Result};
use crate::spec::{ServiceSpec, SpecError, load_service_specs};
use crate::types::{Ctid, ServiceName};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A service whose reconciliation failed during a pass.
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: ServiceName,
    pub error: DeployError,
}

/// Result of one pass over all specs.
#[derive(Debug, Default)]
pub struct PassReport {
    pub outcomes: Vec<(ServiceName, ReconcileOutcome)>,
    pub failures: Vec<ServiceFailure>,
    /// Specs for another node, or reusing an identity already seen this pass.
    pub skipped: usize,
    /// The pass stopped early because it was cancelled.
    pub cancelled: bool,
}

impl PassReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Shortest pass interval; smaller values are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Runner {
    reconciler: Reconciler,
    services_path: PathBuf,
    interval: Duration,
    node: Option<String>,
    span: tracing::Span,
}

impl Runner {
    /// `interval` is clamped to at least [`MIN_INTERVAL`].
    pub fn new(reconciler: Reconciler, services_path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            reconciler,
            services_path: services_path.into(),
            interval: interval.max(MIN_INTERVAL),
            node: None,
            span: tracing::info_span!("runner"),
        }
    }

    /// Only reconcile specs that target `node`.
    pub fn with_node(mut self, node: Option<String>) -> Self {
        self.node = node;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Reconcile immediately, then on every interval tick until cancelled.
    ///
    /// Failing to load specs on the first pass is returned as an error;
    /// on later passes it is logged and the loop keeps going.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        let span = self.span.clone();
        async {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            tracing::info!(
                services_path = %self.services_path.display(),
                interval = ?self.interval,
                "starting"
            );
            self.run_once(cancel).await?;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(e) = self.run_once(cancel).await {
                    tracing::error!(error = %e, "pass failed");
                }
            }

            tracing::info!("stopped");
            Ok::<(), Error>(())
        }
        .instrument(span)
        .await
    }

    /// One pass: load every spec and reconcile each service sequentially.
    pub async fn run_once(&self, cancel: &CancellationToken) -> std::result::Result<PassReport, SpecError> {
        let specs = load_service_specs(&self.services_path)?;
        Ok(self.reconcile_all(&specs, cancel).await)
    }

    /// Reconcile `specs` in order, one at a time.
    pub async fn reconcile_all(&self, specs: &[ServiceSpec], cancel: &CancellationToken) -> PassReport {
        let mut report = PassReport::default();
        let mut seen: HashSet<(&str, Ctid)> = HashSet::new();

        for spec in specs {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if self.node.as_deref().is_some_and(|node| node != spec.node) {
                tracing::debug!(service = %spec.name, node = %spec.node, "skipping spec for another node");
                report.skipped += 1;
                continue;
            }
            if !seen.insert((spec.node.as_str(), spec.ctid)) {
                tracing::warn!(
                    service = %spec.name,
                    node = %spec.node,
                    ctid = %spec.ctid,
                    "ctid already claimed by another spec this pass, skipping"
                );
                report.skipped += 1;
                continue;
            }

            match self.reconciler.reconcile(spec, cancel).await {
                Ok(outcome) => report.outcomes.push((spec.name.clone(), outcome)),
                Err(error) => {
                    if error.is_cancelled() {
                        tracing::warn!(service = %spec.name, "reconcile cancelled");
                        report.cancelled = true;
                    } else {
                        tracing::error!(
                            service = %spec.name,
                            ctid = %spec.ctid,
                            kind = ?error.kind(),
                            error = %error,
                            "reconcile failed"
                        );
                    }
                    report.failures.push(ServiceFailure {
                        service: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            reconciled = report.outcomes.len(),
            failed = report.failures.len(),
            skipped = report.skipped,
            "pass complete"
        );
        report
    }
}
