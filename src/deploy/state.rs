// ABOUTME: Per-pass service state derived from the observed and target digests.
// ABOUTME: Never stored; recomputed from scratch on every reconciliation.

use crate::probe::ActualState;
use crate::types::Digest;

/// Where a service stands relative to its target digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    /// No container holds the identity.
    Absent,
    /// The container runs the target digest.
    Current,
    /// The container runs something else, or nobody knows what.
    Stale { previous: Option<Digest> },
}

impl ServiceState {
    pub fn derive(actual: &ActualState, target: &Digest) -> Self {
        if !actual.exists {
            return ServiceState::Absent;
        }
        match &actual.digest {
            Some(digest) if digest == target => ServiceState::Current,
            previous => ServiceState::Stale {
                previous: previous.clone(),
            },
        }
    }

    pub fn needs_deploy(&self) -> bool {
        !matches!(self, ServiceState::Current)
    }
}
