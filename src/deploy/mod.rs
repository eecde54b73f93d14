// ABOUTME: Rollout engine: derives per-service state and executes a rollout strategy.
// ABOUTME: Exports the Reconciler entry point, outcomes, and the deploy error taxonomy.

mod error;
mod reconciler;
mod rollout;
mod state;
mod strategy;

pub use error::{DeployError, DeployErrorKind, Operation, RollbackFailure};
pub use reconciler::{Reconciler, ReconcilerOptions, UnknownDigestPolicy};
pub use state::ServiceState;
pub use strategy::RolloutStrategy;

use crate::types::Digest;
use std::fmt;

/// What a successful reconcile did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Already running the target digest; nothing was touched.
    UpToDate { digest: Digest },
    /// No container existed; one was created.
    Deployed { digest: Digest },
    /// The old container was replaced.
    Replaced { from: Option<Digest>, to: Digest },
}

impl ReconcileOutcome {
    /// Whether any runtime operation was performed.
    pub fn changed(&self) -> bool {
        !matches!(self, ReconcileOutcome::UpToDate { .. })
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::UpToDate { digest } => write!(f, "up to date at {}", digest),
            ReconcileOutcome::Deployed { digest } => write!(f, "deployed {}", digest),
            ReconcileOutcome::Replaced { from: Some(from), to } => {
                write!(f, "replaced {} with {}", from, to)
            }
            ReconcileOutcome::Replaced { from: None, to } => {
                write!(f, "replaced unknown digest with {}", to)
            }
        }
    }
}
