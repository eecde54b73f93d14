// ABOUTME: The reconcile entry point: resolve, probe, decide, then execute a rollout.
// ABOUTME: Holds injected collaborators and a tracing span; no process-wide defaults.

use super::error::DeployError;
use super::rollout::RolloutContext;
use super::state::ServiceState;
use super::strategy::RolloutStrategy;
use super::ReconcileOutcome;
use crate::health::ReadinessGate;
use crate::probe::ActualStateProber;
use crate::registry::DigestResolver;
use crate::runtime::RuntimeAdapter;
use crate::spec::ServiceSpec;
use crate::state::StateStore;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What to do with an existing container whose deployed digest was never recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownDigestPolicy {
    /// Treat it as stale and replace it.
    #[default]
    Redeploy,
    /// Leave it alone and report it for an operator to adopt.
    Hold,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// Upper bound on the readiness gate. `None` waits until cancelled.
    pub readiness_timeout: Option<Duration>,
    pub unknown_digest: UnknownDigestPolicy,
}

/// Drives one service at a time toward its declared digest.
pub struct Reconciler {
    resolver: DigestResolver,
    prober: ActualStateProber,
    runtime: Arc<dyn RuntimeAdapter>,
    store: Arc<dyn StateStore>,
    gate: Arc<dyn ReadinessGate>,
    options: ReconcilerOptions,
    span: tracing::Span,
}

impl Reconciler {
    pub fn new(
        resolver: DigestResolver,
        runtime: Arc<dyn RuntimeAdapter>,
        store: Arc<dyn StateStore>,
        gate: Arc<dyn ReadinessGate>,
    ) -> Self {
        Self {
            resolver,
            prober: ActualStateProber::new(runtime.clone(), store.clone()),
            runtime,
            store,
            gate,
            options: ReconcilerOptions::default(),
            span: tracing::info_span!("reconciler"),
        }
    }

    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Emit all events for this reconciler under `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Bring `spec`'s container to its target digest.
    ///
    /// An unknown strategy fails before any network or runtime call. Digest
    /// resolution and state probing both finish before anything is changed.
    /// Cancelling `cancel` aborts the in-flight call and returns a
    /// cancellation error; store writes are never left half done.
    pub async fn reconcile(
        &self,
        spec: &ServiceSpec,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, DeployError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "reconcile",
            service = %spec.name,
            node = %spec.node,
            ctid = %spec.ctid
        );
        self.reconcile_inner(spec, cancel).instrument(span).await
    }

    async fn reconcile_inner(
        &self,
        spec: &ServiceSpec,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, DeployError> {
        let strategy: RolloutStrategy = spec.rollout.strategy.parse()?;

        let target = until_cancelled(
            cancel,
            self.resolver
                .resolve(&spec.image, &spec.tag, &spec.pull_policy),
        )
        .await??;

        let actual = until_cancelled(cancel, self.prober.probe(&spec.node, spec.ctid)).await??;
        let state = ServiceState::derive(&actual, &target);
        tracing::debug!(?state, %target, %strategy, "observed");

        if !state.needs_deploy() {
            tracing::info!(digest = %target, "up to date");
            return Ok(ReconcileOutcome::UpToDate { digest: target });
        }
        if matches!(state, ServiceState::Stale { previous: None })
            && self.options.unknown_digest == UnknownDigestPolicy::Hold
        {
            return Err(DeployError::AmbiguousState { ctid: spec.ctid });
        }

        let ctx = RolloutContext {
            spec,
            runtime: self.runtime.as_ref(),
            store: self.store.as_ref(),
            gate: self.gate.as_ref(),
            cancel,
            readiness_timeout: self.options.readiness_timeout,
            running: actual.is_running(),
        };
        let outcome = strategy.execute(&ctx, state, &target).await?;
        tracing::info!(%outcome, "reconciled");
        Ok(outcome)
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, DeployError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled),
        out = fut => Ok(out),
    }
}
