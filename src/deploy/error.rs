// ABOUTME: Error taxonomy for a single service's reconciliation.
// ABOUTME: Rollback failures keep the triggering error and the rollback error as separate causes.

use super::strategy::RolloutStrategy;
use crate::health::ReadinessError;
use crate::probe::ProbeError;
use crate::registry::ResolutionError;
use crate::runtime::RuntimeError;
use crate::state::StateError;
use crate::types::{Ctid, Digest};
use std::fmt;

/// Runtime operation issued by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Start,
    Stop,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Create => "create",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Destroy => "destroy",
        };
        f.write_str(verb)
    }
}

/// Errors that can end one service's reconciliation.
///
/// Every error is scoped to the service being reconciled; callers are
/// expected to log it and move on to the next service.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("resolve target digest: {0}")]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("{op} container {ctid}: {source}")]
    Operation {
        op: Operation,
        ctid: Ctid,
        source: RuntimeError,
    },

    #[error("readiness: {0}")]
    Readiness(#[from] ReadinessError),

    #[error("rollout strategy {0} is not implemented")]
    StrategyUnsupported(RolloutStrategy),

    #[error("unknown rollout strategy {0:?}")]
    UnknownStrategy(String),

    #[error("state store: {0}")]
    State(#[from] StateError),

    /// A rollout failed and a rollback was attempted.
    #[error(transparent)]
    Rollback(Box<RollbackFailure>),

    /// Container exists but no digest was ever recorded for it.
    #[error(
        "container {ctid} exists but its deployed digest is unknown; record a state entry to adopt it"
    )]
    AmbiguousState { ctid: Ctid },

    #[error("reconciliation cancelled")]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Resolution,
    Probe,
    Operation,
    Readiness,
    StrategyUnsupported,
    UnknownStrategy,
    State,
    Rollback,
    AmbiguousState,
    Cancelled,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Resolution(_) => DeployErrorKind::Resolution,
            DeployError::Probe(_) => DeployErrorKind::Probe,
            DeployError::Operation { .. } => DeployErrorKind::Operation,
            DeployError::Readiness(_) => DeployErrorKind::Readiness,
            DeployError::StrategyUnsupported(_) => DeployErrorKind::StrategyUnsupported,
            DeployError::UnknownStrategy(_) => DeployErrorKind::UnknownStrategy,
            DeployError::State(_) => DeployErrorKind::State,
            DeployError::Rollback(_) => DeployErrorKind::Rollback,
            DeployError::AmbiguousState { .. } => DeployErrorKind::AmbiguousState,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
        }
    }

    /// True when the pass stopped because it was asked to.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            DeployError::Cancelled | DeployError::Readiness(ReadinessError::Cancelled)
        )
    }

    /// True for a runtime operation that failed because the container is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeployError::Operation { source, .. } if source.is_not_found())
    }

    /// The rollback details, if this failure triggered one.
    pub fn rollback_failure(&self) -> Option<&RollbackFailure> {
        match self {
            DeployError::Rollback(failure) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn operation(op: Operation, ctid: Ctid, source: RuntimeError) -> Self {
        DeployError::Operation { op, ctid, source }
    }
}

/// A failed rollout together with the outcome of rolling back.
///
/// `trigger` is always present. `rollback` is `None` when the previous
/// digest was restored successfully, in which case the service is running
/// `restored` again but the pass still reports the trigger as a failure.
#[derive(Debug)]
pub struct RollbackFailure {
    pub trigger: DeployError,
    pub restored: Digest,
    pub rollback: Option<DeployError>,
}

impl RollbackFailure {
    /// Whether the previous digest is running again.
    pub fn recovered(&self) -> bool {
        self.rollback.is_none()
    }
}

impl fmt::Display for RollbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rollback {
            None => write!(
                f,
                "rollout failed, rolled back to {}: {}",
                self.restored, self.trigger
            ),
            Some(rollback) => write!(
                f,
                "rollout failed: {}; rollback to {} also failed: {}",
                self.trigger, self.restored, rollback
            ),
        }
    }
}

impl std::error::Error for RollbackFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctid() -> Ctid {
        Ctid::new(101).unwrap()
    }

    #[test]
    fn rollback_display_names_both_causes() {
        let failure = RollbackFailure {
            trigger: DeployError::operation(
                Operation::Start,
                ctid(),
                RuntimeError::Other("boom".into()),
            ),
            restored: Digest::new("sha256:old"),
            rollback: Some(DeployError::operation(
                Operation::Create,
                ctid(),
                RuntimeError::Other("disk full".into()),
            )),
        };
        let msg = failure.to_string();
        assert!(msg.contains("start container 101: runtime error: boom"));
        assert!(msg.contains("rollback to sha256:old also failed"));
        assert!(msg.contains("disk full"));
        assert!(!failure.recovered());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            DeployError::UnknownStrategy("canary".into()).kind(),
            DeployErrorKind::UnknownStrategy
        );
        assert_eq!(
            DeployError::StrategyUnsupported(RolloutStrategy::BlueGreen).kind(),
            DeployErrorKind::StrategyUnsupported
        );
        assert_eq!(
            DeployError::AmbiguousState { ctid: ctid() }.kind(),
            DeployErrorKind::AmbiguousState
        );
    }

    #[test]
    fn readiness_cancellation_counts_as_cancelled() {
        assert!(DeployError::Readiness(ReadinessError::Cancelled).is_cancelled());
        assert!(DeployError::Cancelled.is_cancelled());
        assert!(!DeployError::UnknownStrategy("x".into()).is_cancelled());
    }

    #[test]
    fn not_found_operation_is_detectable() {
        let err = DeployError::operation(Operation::Destroy, ctid(), RuntimeError::NotFound(ctid()));
        assert!(err.is_not_found());
    }
}
