// ABOUTME: In-memory runtime adapter that simulates containers without touching the host.
// ABOUTME: Lets the full reconciliation flow run end to end for previews and smoke tests.

use super::{ContainerStatus, RuntimeAdapter, RuntimeError};
use crate::spec::ServiceSpec;
use crate::types::{Ctid, Digest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Simulated {
    digest: Digest,
    running: bool,
}

/// Simulated runtime. Containers live only as long as this value.
#[derive(Debug, Default)]
pub struct DryRunRuntime {
    containers: Mutex<HashMap<Ctid, Simulated>>,
}

impl DryRunRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_running(&self, ctid: Ctid, running: bool) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock();
        let container = containers
            .get_mut(&ctid)
            .ok_or(RuntimeError::NotFound(ctid))?;
        container.running = running;
        Ok(())
    }
}

#[async_trait]
impl RuntimeAdapter for DryRunRuntime {
    async fn probe_existence(
        &self,
        _node: &str,
        ctid: Ctid,
    ) -> Result<ContainerStatus, RuntimeError> {
        let containers = self.containers.lock();
        let container = containers.get(&ctid).ok_or(RuntimeError::NotFound(ctid))?;
        Ok(ContainerStatus::new(if container.running {
            "running"
        } else {
            "stopped"
        }))
    }

    async fn create(&self, spec: &ServiceSpec, digest: &Digest) -> Result<(), RuntimeError> {
        tracing::info!(service = %spec.name, ctid = %spec.ctid, %digest, "dry-run: create");
        let mut containers = self.containers.lock();
        if containers.contains_key(&spec.ctid) {
            return Err(RuntimeError::Other(format!(
                "container {} already exists",
                spec.ctid
            )));
        }
        containers.insert(
            spec.ctid,
            Simulated {
                digest: digest.clone(),
                running: false,
            },
        );
        Ok(())
    }

    async fn start(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        tracing::info!(%ctid, "dry-run: start");
        self.set_running(ctid, true)
    }

    async fn stop(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        tracing::info!(%ctid, "dry-run: stop");
        self.set_running(ctid, false)
    }

    async fn destroy(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        let removed = self
            .containers
            .lock()
            .remove(&ctid)
            .ok_or(RuntimeError::NotFound(ctid))?;
        tracing::info!(%ctid, digest = %removed.digest, "dry-run: destroy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
metadata:
  name: web
spec:
  node: pve1
  ctid: 101
  image: ghcr.io/org/web
"#;

    #[tokio::test]
    async fn simulates_container_lifecycle() {
        let runtime = DryRunRuntime::new();
        let spec = ServiceSpec::from_yaml(SPEC).unwrap();
        let digest = Digest::new("sha256:abc");

        runtime.create(&spec, &digest).await.unwrap();
        let status = runtime.probe_existence("pve1", spec.ctid).await.unwrap();
        assert!(!status.is_running());

        runtime.start("pve1", spec.ctid).await.unwrap();
        let status = runtime.probe_existence("pve1", spec.ctid).await.unwrap();
        assert!(status.is_running());

        runtime.stop("pve1", spec.ctid).await.unwrap();
        runtime.destroy("pve1", spec.ctid).await.unwrap();
        let err = runtime.probe_existence("pve1", spec.ctid).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_refuses_an_existing_identity() {
        let runtime = DryRunRuntime::new();
        let spec = ServiceSpec::from_yaml(SPEC).unwrap();
        runtime.create(&spec, &Digest::new("sha256:a")).await.unwrap();

        let err = runtime
            .create(&spec, &Digest::new("sha256:b"))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn destroying_a_missing_container_is_not_found() {
        let runtime = DryRunRuntime::new();
        let err = runtime
            .destroy("pve1", Ctid::new(7).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
