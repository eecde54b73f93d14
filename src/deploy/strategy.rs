// ABOUTME: Closed set of rollout strategies, each with its own execution path.
// ABOUTME: Recreate replaces in place; blue-green is reserved and fails fast.

use super::error::DeployError;
use super::rollout::RolloutContext;
use super::state::ServiceState;
use super::ReconcileOutcome;
use crate::types::Digest;
use std::fmt;
use std::str::FromStr;

/// Strategy for moving a service to a new digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutStrategy {
    /// Stop and destroy the old container, then create the new one.
    /// Briefly unavailable; never two containers on one identity.
    Recreate,

    /// Start the new version alongside the old one and cut over after it
    /// passes readiness. Not implemented yet.
    BlueGreen,
}

impl FromStr for RolloutStrategy {
    type Err = DeployError;

    /// Case-insensitive. `bluegreen` and `blue-green` are both accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recreate" => Ok(RolloutStrategy::Recreate),
            "bluegreen" | "blue-green" => Ok(RolloutStrategy::BlueGreen),
            _ => Err(DeployError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for RolloutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutStrategy::Recreate => f.write_str("recreate"),
            RolloutStrategy::BlueGreen => f.write_str("blue-green"),
        }
    }
}

impl RolloutStrategy {
    /// Move the service from `state` to `target`.
    pub(crate) async fn execute(
        self,
        ctx: &RolloutContext<'_>,
        state: ServiceState,
        target: &Digest,
    ) -> Result<ReconcileOutcome, DeployError> {
        match (self, state) {
            (_, ServiceState::Current) => Ok(ReconcileOutcome::UpToDate {
                digest: target.clone(),
            }),
            (RolloutStrategy::BlueGreen, _) => Err(DeployError::StrategyUnsupported(self)),
            (RolloutStrategy::Recreate, ServiceState::Absent) => {
                ctx.deploy_fresh(target).await?;
                Ok(ReconcileOutcome::Deployed {
                    digest: target.clone(),
                })
            }
            (RolloutStrategy::Recreate, ServiceState::Stale { previous }) => {
                ctx.recreate(previous.clone(), target).await?;
                Ok(ReconcileOutcome::Replaced {
                    from: previous,
                    to: target.clone(),
                })
            }
        }
    }
}
