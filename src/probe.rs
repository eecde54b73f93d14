// ABOUTME: Actual-State Prober combining runtime existence with the recorded digest.
// ABOUTME: A missing container is a valid observation, not an error.

use crate::runtime::{ContainerStatus, RuntimeAdapter, RuntimeError};
use crate::state::{StateError, StateStore};
use crate::types::{Ctid, Digest};
use std::sync::Arc;

/// Observed state for one container identity on one node.
///
/// Recomputed on every pass; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualState {
    pub exists: bool,
    pub ctid: Ctid,
    pub node: String,
    /// Status reported by the runtime, if the container exists.
    pub status: Option<ContainerStatus>,
    /// Digest last recorded in the state store. `None` means unknown.
    pub digest: Option<Digest>,
}

impl ActualState {
    pub fn absent(node: impl Into<String>, ctid: Ctid) -> Self {
        ActualState {
            exists: false,
            ctid,
            node: node.into(),
            status: None,
            digest: None,
        }
    }

    /// Whether the container exists and the runtime reports it running.
    pub fn is_running(&self) -> bool {
        self.status.as_ref().is_some_and(ContainerStatus::is_running)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe container {ctid}: {source}")]
    Runtime { ctid: Ctid, source: RuntimeError },

    #[error("probe container {ctid}: {source}")]
    State { ctid: Ctid, source: StateError },
}

#[derive(Clone)]
pub struct ActualStateProber {
    runtime: Arc<dyn RuntimeAdapter>,
    store: Arc<dyn StateStore>,
}

impl ActualStateProber {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>, store: Arc<dyn StateStore>) -> Self {
        Self { runtime, store }
    }

    /// Observe `ctid` on `node`.
    ///
    /// The state store is only consulted when the container exists; a stale
    /// entry for a missing container does not leak into the result.
    pub async fn probe(&self, node: &str, ctid: Ctid) -> Result<ActualState, ProbeError> {
        let status = match self.runtime.probe_existence(node, ctid).await {
            Ok(status) => status,
            Err(e) if e.is_not_found() => return Ok(ActualState::absent(node, ctid)),
            Err(source) => return Err(ProbeError::Runtime { ctid, source }),
        };

        let entry = self
            .store
            .load(ctid)
            .map_err(|source| ProbeError::State { ctid, source })?;

        Ok(ActualState {
            exists: true,
            ctid,
            node: node.to_string(),
            status: Some(status),
            digest: entry.map(|e| e.digest),
        })
    }
}
