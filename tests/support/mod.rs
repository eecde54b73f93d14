// ABOUTME: Test support utilities.
// ABOUTME: Recording fakes for the runtime, registry, readiness gate, and state store.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rollkeeper::deploy::Reconciler;
use rollkeeper::health::{ReadinessError, ReadinessGate};
use rollkeeper::registry::{DigestResolver, RegistryClient, RegistryError};
use rollkeeper::runtime::{ContainerStatus, RuntimeAdapter, RuntimeError};
use rollkeeper::spec::ServiceSpec;
use rollkeeper::state::{EntryStatus, FileStateStore, StateEntry, StateError, StateStore};
use rollkeeper::types::{Ctid, Digest, ImageName};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("rollkeeper=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Ordered record of every side effect, shared by all fakes of one test.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Events whose verb is one of the runtime operations.
    pub fn runtime_ops(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| {
                ["create", "start", "stop", "destroy"]
                    .iter()
                    .any(|verb| e.starts_with(verb))
            })
            .collect()
    }
}

// =============================================================================
// Runtime
// =============================================================================

pub struct FakeRuntime {
    log: Log,
    containers: Mutex<HashMap<Ctid, (Digest, String)>>,
    failing_creates: Mutex<HashSet<String>>,
    failing_ops: Mutex<HashSet<&'static str>>,
}

impl FakeRuntime {
    pub fn new(log: Log) -> Arc<Self> {
        Arc::new(FakeRuntime {
            log,
            containers: Mutex::new(HashMap::new()),
            failing_creates: Mutex::new(HashSet::new()),
            failing_ops: Mutex::new(HashSet::new()),
        })
    }

    /// Seed a container as if it had been deployed earlier.
    pub fn with_container(self: Arc<Self>, ctid: Ctid, digest: &str, status: &str) -> Arc<Self> {
        self.containers
            .lock()
            .insert(ctid, (Digest::new(digest), status.to_string()));
        self
    }

    /// `create` fails for this digest.
    pub fn fail_create(&self, digest: &str) {
        self.failing_creates.lock().insert(digest.to_string());
    }

    /// `probe`, `start`, `stop` or `destroy` fails with a non-NotFound error.
    pub fn fail_op(&self, op: &'static str) {
        self.failing_ops.lock().insert(op);
    }

    pub fn digest_of(&self, ctid: Ctid) -> Option<Digest> {
        self.containers.lock().get(&ctid).map(|(d, _)| d.clone())
    }

    fn check(&self, op: &'static str) -> Result<(), RuntimeError> {
        if self.failing_ops.lock().contains(op) {
            return Err(RuntimeError::Other(format!("{op} failed")));
        }
        Ok(())
    }

    fn set_status(&self, ctid: Ctid, status: &str) -> Result<(), RuntimeError> {
        let mut containers = self.containers.lock();
        let container = containers.get_mut(&ctid).ok_or(RuntimeError::NotFound(ctid))?;
        container.1 = status.to_string();
        Ok(())
    }
}

#[async_trait]
impl RuntimeAdapter for FakeRuntime {
    async fn probe_existence(&self, _node: &str, ctid: Ctid) -> Result<ContainerStatus, RuntimeError> {
        self.check("probe")?;
        self.containers
            .lock()
            .get(&ctid)
            .map(|(_, status)| ContainerStatus::new(status.clone()))
            .ok_or(RuntimeError::NotFound(ctid))
    }

    async fn create(&self, spec: &ServiceSpec, digest: &Digest) -> Result<(), RuntimeError> {
        self.log.push(format!("create {} {}", spec.ctid, digest));
        if self.failing_creates.lock().contains(digest.as_str()) {
            return Err(RuntimeError::Other(format!("create {} failed", digest)));
        }
        self.containers
            .lock()
            .insert(spec.ctid, (digest.clone(), "stopped".to_string()));
        Ok(())
    }

    async fn start(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.log.push(format!("start {}", ctid));
        self.check("start")?;
        self.set_status(ctid, "running")
    }

    async fn stop(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.log.push(format!("stop {}", ctid));
        self.check("stop")?;
        let running = self
            .containers
            .lock()
            .get(&ctid)
            .is_some_and(|(_, status)| status == "running");
        if !running {
            return Err(RuntimeError::Other(format!("container {ctid} not running")));
        }
        self.set_status(ctid, "stopped")
    }

    async fn destroy(&self, _node: &str, ctid: Ctid) -> Result<(), RuntimeError> {
        self.log.push(format!("destroy {}", ctid));
        self.check("destroy")?;
        self.containers
            .lock()
            .remove(&ctid)
            .map(|_| ())
            .ok_or(RuntimeError::NotFound(ctid))
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry with a fixed tag -> digest table.
pub struct FakeRegistry {
    tags: Mutex<HashMap<String, String>>,
    calls: Mutex<u32>,
}

impl FakeRegistry {
    pub fn new(tags: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(FakeRegistry {
            tags: Mutex::new(
                tags.iter()
                    .map(|(t, d)| (t.to_string(), d.to_string()))
                    .collect(),
            ),
            calls: Mutex::new(0),
        })
    }

    /// Re-push `tag` so it points at `digest`.
    pub fn push(&self, tag: &str, digest: &str) {
        self.tags.lock().insert(tag.to_string(), digest.to_string());
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn head_digest(&self, image: &ImageName, tag: &str) -> Result<Digest, RegistryError> {
        *self.calls.lock() += 1;
        self.tags
            .lock()
            .get(tag)
            .map(Digest::new)
            .ok_or_else(|| RegistryError::Lookup {
                reference: image.reference(tag),
                reason: "manifest unknown".to_string(),
            })
    }
}

// =============================================================================
// Readiness gate
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub enum GateMode {
    Pass,
    /// Fail the next `n` waits, then pass.
    FailTimes(u32),
    /// Block until cancelled.
    Hang,
}

pub struct FakeGate {
    log: Log,
    mode: Mutex<GateMode>,
}

impl FakeGate {
    pub fn new(log: Log, mode: GateMode) -> Arc<Self> {
        Arc::new(FakeGate {
            log,
            mode: Mutex::new(mode),
        })
    }
}

#[async_trait]
impl ReadinessGate for FakeGate {
    async fn wait(&self, spec: &ServiceSpec, cancel: &CancellationToken) -> Result<(), ReadinessError> {
        self.log.push(format!("wait {}", spec.ctid));
        let mode = {
            let mut mode = self.mode.lock();
            let current = *mode;
            if let GateMode::FailTimes(n) = current {
                *mode = if n > 1 { GateMode::FailTimes(n - 1) } else { GateMode::Pass };
            }
            current
        };
        match mode {
            GateMode::Pass => Ok(()),
            GateMode::FailTimes(_) => Err(ReadinessError::Timeout(Duration::from_secs(30))),
            GateMode::Hang => {
                cancel.cancelled().await;
                Err(ReadinessError::Cancelled)
            }
        }
    }
}

// =============================================================================
// State store
// =============================================================================

/// File store that records every write in the shared log.
pub struct RecordingStore {
    log: Log,
    inner: FileStateStore,
}

impl RecordingStore {
    pub fn new(log: Log, dir: &std::path::Path) -> Arc<Self> {
        Arc::new(RecordingStore {
            log,
            inner: FileStateStore::open(dir).unwrap(),
        })
    }

    /// Seed an entry without logging it.
    pub fn seed(&self, ctid: Ctid, digest: &str) {
        self.inner
            .save(StateEntry::new(
                ctid,
                Digest::new(digest),
                EntryStatus::Running,
                "pve1",
            ))
            .unwrap();
    }
}

impl StateStore for RecordingStore {
    fn load(&self, ctid: Ctid) -> Result<Option<StateEntry>, StateError> {
        self.inner.load(ctid)
    }

    fn save(&self, entry: StateEntry) -> Result<StateEntry, StateError> {
        self.log
            .push(format!("save {} {} {}", entry.ctid, entry.digest, entry.status));
        self.inner.save(entry)
    }

    fn remove(&self, ctid: Ctid) -> Result<(), StateError> {
        self.log.push(format!("remove {}", ctid));
        self.inner.remove(ctid)
    }

    fn update(
        &self,
        ctid: Ctid,
        apply: &mut dyn FnMut(&mut StateEntry),
    ) -> Result<Option<StateEntry>, StateError> {
        let updated = self.inner.update(ctid, apply)?;
        if let Some(entry) = &updated {
            self.log.push(format!("update {} {}", ctid, entry.status));
        }
        Ok(updated)
    }

    fn list(&self) -> Result<Vec<StateEntry>, StateError> {
        self.inner.list()
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A reconciler wired to recording fakes.
pub struct Harness {
    pub log: Log,
    pub runtime: Arc<FakeRuntime>,
    pub registry: Arc<FakeRegistry>,
    pub store: Arc<RecordingStore>,
    pub gate: Arc<FakeGate>,
    dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(tags: &[(&str, &str)], gate: GateMode) -> Self {
        init_tracing();
        let log = Log::default();
        let dir = tempfile::tempdir().unwrap();
        Harness {
            runtime: FakeRuntime::new(log.clone()),
            registry: FakeRegistry::new(tags),
            store: RecordingStore::new(log.clone(), dir.path()),
            gate: FakeGate::new(log.clone(), gate),
            log,
            dir,
        }
    }

    /// Pretend `digest` was deployed earlier and is running.
    pub fn deployed(mut self, ctid: Ctid, digest: &str) -> Self {
        self.runtime = self.runtime.with_container(ctid, digest, "running");
        self.store.seed(ctid, digest);
        self
    }

    /// Pretend `digest` was deployed earlier but has since been stopped.
    pub fn stopped(mut self, ctid: Ctid, digest: &str) -> Self {
        self.runtime = self.runtime.with_container(ctid, digest, "stopped");
        self.store.seed(ctid, digest);
        self
    }

    /// Directory backing the state store.
    pub fn state_dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// A running container the store knows nothing about.
    pub fn untracked(mut self, ctid: Ctid, digest: &str) -> Self {
        self.runtime = self.runtime.with_container(ctid, digest, "running");
        self
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            DigestResolver::new(self.registry.clone()),
            self.runtime.clone(),
            self.store.clone(),
            self.gate.clone(),
        )
    }
}

/// A spec for ctid 101 on pve1 with the given tag and rollout settings.
pub fn spec(tag: &str, pull_policy: &str, strategy: &str, auto_rollback: bool) -> ServiceSpec {
    ServiceSpec::from_yaml(&format!(
        r#"
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  node: pve1
  ctid: 101
  image: ghcr.io/org/web
  tag: "{tag}"
  pullPolicy: {pull_policy}
  resources:
    cores: 2
    memoryMB: 1024
  rollout:
    strategy: {strategy}
    autoRollback: {auto_rollback}
"#
    ))
    .unwrap()
}

pub fn ctid() -> Ctid {
    Ctid::new(101).unwrap()
}
