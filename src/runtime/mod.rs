// ABOUTME: Capability contract for the hypervisor container runtime.
// ABOUTME: Exposes existence probing and create/start/stop/destroy, plus pct and dry-run adapters.

mod dry_run;
mod error;
mod pct;

pub use dry_run::DryRunRuntime;
pub use error::{CommandError, RuntimeError};
pub use pct::PctRuntime;

use crate::spec::ServiceSpec;
use crate::types::{Ctid, Digest};
use async_trait::async_trait;

/// What the runtime reports about an existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    /// Free-form status string, e.g. "running" or "stopped".
    pub status: String,
}

impl ContainerStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

/// Operations the rollout engine issues against a host's containers.
///
/// Implementations must report a missing container as
/// [`RuntimeError::NotFound`] so callers can tell "absent" from "broken".
/// Every call is expected to finish or fail within its own bounded time.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Status of `ctid` on `node`, or `NotFound`.
    async fn probe_existence(&self, node: &str, ctid: Ctid)
    -> Result<ContainerStatus, RuntimeError>;

    /// Create the container described by `spec`, running `digest`.
    async fn create(&self, spec: &ServiceSpec, digest: &Digest) -> Result<(), RuntimeError>;

    async fn start(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError>;

    async fn stop(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError>;

    async fn destroy(&self, node: &str, ctid: Ctid) -> Result<(), RuntimeError>;
}
