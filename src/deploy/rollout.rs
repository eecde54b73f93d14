// ABOUTME: Operation sequences for fresh deploys, in-place recreation, and rollback.
// ABOUTME: Every runtime call races the cancellation token; state is written between calls only.

use super::error::{DeployError, Operation, RollbackFailure};
use crate::health::{ReadinessError, ReadinessGate};
use crate::runtime::{RuntimeAdapter, RuntimeError};
use crate::spec::ServiceSpec;
use crate::state::{EntryStatus, StateEntry, StateStore};
use crate::types::Digest;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one service's rollout needs, borrowed for a single pass.
pub(crate) struct RolloutContext<'a> {
    pub spec: &'a ServiceSpec,
    pub runtime: &'a dyn RuntimeAdapter,
    pub store: &'a dyn StateStore,
    pub gate: &'a dyn ReadinessGate,
    pub cancel: &'a CancellationToken,
    pub readiness_timeout: Option<Duration>,
    /// Whether the existing container was running when probed.
    pub running: bool,
}

impl RolloutContext<'_> {
    /// Create, start, wait for readiness, then record `digest` as running.
    ///
    /// Nothing is written to the store unless every step succeeds.
    pub async fn deploy_fresh(&self, digest: &Digest) -> Result<(), DeployError> {
        let spec = self.spec;
        tracing::info!(%digest, "deploying");

        self.perform(Operation::Create, self.runtime.create(spec, digest))
            .await?;
        self.perform(Operation::Start, self.runtime.start(&spec.node, spec.ctid))
            .await?;
        self.await_ready().await?;

        self.store.save(StateEntry::new(
            spec.ctid,
            digest.clone(),
            EntryStatus::Running,
            spec.node.clone(),
        ))?;
        tracing::info!(%digest, "deployed");
        Ok(())
    }

    /// Stop (if running) and destroy the current container, then deploy
    /// `target` fresh.
    ///
    /// If the fresh deploy fails and auto-rollback is enabled with a known
    /// `previous` digest, the failed attempt is destroyed and `previous` is
    /// deployed again.
    pub async fn recreate(&self, previous: Option<Digest>, target: &Digest) -> Result<(), DeployError> {
        let spec = self.spec;
        tracing::info!(
            previous = previous.as_ref().map(Digest::as_str).unwrap_or("unknown"),
            %target,
            "recreating"
        );

        if self.running {
            self.perform(Operation::Stop, self.runtime.stop(&spec.node, spec.ctid))
                .await?;
        } else {
            tracing::debug!("container not running, skipping stop");
        }
        self.store.update(spec.ctid, &mut |entry: &mut StateEntry| {
            entry.status = EntryStatus::Stopped;
        })?;

        self.perform(Operation::Destroy, self.runtime.destroy(&spec.node, spec.ctid))
            .await?;
        self.store.remove(spec.ctid)?;

        match self.deploy_fresh(target).await {
            Ok(()) => Ok(()),
            Err(trigger) => Err(self.recover(trigger, previous).await),
        }
    }

    /// Decide whether to roll back after `trigger`, and do it.
    async fn recover(&self, trigger: DeployError, previous: Option<Digest>) -> DeployError {
        if !self.spec.rollout.auto_rollback {
            return trigger;
        }
        let Some(previous) = previous else {
            tracing::warn!(error = %trigger, "rollout failed with no previous digest to restore");
            return trigger;
        };
        if self.cancel.is_cancelled() {
            tracing::warn!(error = %trigger, "rollout cancelled, skipping rollback");
            return trigger;
        }

        tracing::warn!(error = %trigger, %previous, "rollout failed, rolling back");
        let rollback = self.restore(&previous).await.err();
        match &rollback {
            None => tracing::info!(%previous, "rolled back"),
            Some(e) => tracing::error!(error = %e, %previous, "rollback failed"),
        }

        DeployError::Rollback(Box::new(RollbackFailure {
            trigger,
            restored: previous,
            rollback,
        }))
    }

    /// Remove whatever the failed attempt left behind and redeploy `previous`.
    async fn restore(&self, previous: &Digest) -> Result<(), DeployError> {
        let spec = self.spec;
        match self
            .perform(Operation::Destroy, self.runtime.destroy(&spec.node, spec.ctid))
            .await
        {
            Err(e) if e.is_not_found() => {}
            other => other?,
        }
        self.deploy_fresh(previous).await
    }

    async fn await_ready(&self) -> Result<(), DeployError> {
        let wait = self.gate.wait(self.spec, self.cancel);
        match self.readiness_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ReadinessError::Timeout(limit))??,
            None => wait.await?,
        }
        Ok(())
    }

    /// Run one runtime call, abandoning it if the pass is cancelled.
    async fn perform<F>(&self, op: Operation, call: F) -> Result<(), DeployError>
    where
        F: Future<Output = Result<(), RuntimeError>>,
    {
        tracing::debug!(%op, "runtime call");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeployError::Cancelled),
            res = call => res.map_err(|source| DeployError::operation(op, self.spec.ctid, source)),
        }
    }
}
