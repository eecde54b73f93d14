// ABOUTME: Desired-state model for one managed service, parsed from YAML.
// ABOUTME: Validates required fields, applies defaults, and discovers spec files.

mod error;
mod manifest;

pub use error::{SpecError, ValidationError};

use crate::types::{Ctid, ImageName, ServiceName};
use manifest::{HealthCheckManifest, ServiceManifest};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_PULL_POLICY: &str = "digest";
pub const DEFAULT_STRATEGY: &str = "recreate";

const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_HEALTHY_THRESHOLD: u32 = 1;

/// Desired state for one workload, validated and defaulted.
///
/// Immutable for the duration of a reconciliation pass. Pull policy and
/// rollout strategy stay as declared strings; the resolver and the engine
/// reject values they do not understand.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub name: ServiceName,
    pub node: String,
    pub ctid: Ctid,
    pub image: ImageName,
    pub tag: String,
    pub pull_policy: String,
    pub resources: Resources,
    pub network: Option<Network>,
    pub mounts: Vec<Mount>,
    pub health_check: HealthCheck,
    pub rollout: Rollout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    pub cores: u32,
    pub memory_mb: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub bridge: String,
    pub ip: Option<String>,
    pub gw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub guest: String,
    pub options: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Probe kind; only `http` is acted on.
    pub kind: Option<String>,
    pub url: Option<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub healthy_threshold: u32,
}

impl HealthCheck {
    /// The URL to poll, if an HTTP check is configured.
    pub fn http_url(&self) -> Option<&str> {
        let is_http = self
            .kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("http"));
        match self.url.as_deref() {
            Some(url) if is_http && !url.is_empty() => Some(url),
            _ => None,
        }
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        HealthCheck {
            kind: None,
            url: None,
            timeout: DEFAULT_HEALTH_TIMEOUT,
            interval: DEFAULT_HEALTH_INTERVAL,
            healthy_threshold: DEFAULT_HEALTHY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollout {
    pub strategy: String,
    pub max_unavailable: u32,
    pub auto_rollback: bool,
}

impl ServiceSpec {
    /// Parse and validate a single YAML declaration.
    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        let manifest: ServiceManifest = serde_yaml::from_str(yaml)?;
        Ok(Self::validate(manifest)?)
    }

    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    fn validate(manifest: ServiceManifest) -> Result<Self, ValidationError> {
        let body = manifest.spec;

        let name = match manifest.metadata.name.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingName),
            Some(name) => ServiceName::new(name)?,
        };
        let ctid = match body.ctid {
            None => return Err(ValidationError::MissingCtid),
            Some(value) => Ctid::new(value)?,
        };
        let node = non_empty(body.node).ok_or(ValidationError::MissingNode)?;
        let image = match non_empty(body.image) {
            None => return Err(ValidationError::MissingImage),
            Some(image) => ImageName::parse(&image)?,
        };

        let network = body
            .network
            .map(|n| {
                let bridge = non_empty(n.bridge).ok_or(ValidationError::MissingBridge)?;
                Ok::<_, ValidationError>(Network {
                    bridge,
                    ip: non_empty(n.ip),
                    gw: non_empty(n.gw),
                })
            })
            .transpose()?;

        let mounts = body
            .mounts
            .into_iter()
            .map(|m| {
                if m.host.trim().is_empty() || m.guest.trim().is_empty() {
                    return Err(ValidationError::IncompleteMount);
                }
                Ok(Mount {
                    host: PathBuf::from(m.host),
                    guest: m.guest,
                    options: non_empty(m.options),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceSpec {
            api_version: manifest.api_version,
            kind: manifest.kind,
            name,
            node,
            ctid,
            image,
            tag: non_empty(body.tag).unwrap_or_else(|| DEFAULT_TAG.to_string()),
            pull_policy: non_empty(body.pull_policy)
                .unwrap_or_else(|| DEFAULT_PULL_POLICY.to_string()),
            resources: Resources {
                cores: body.resources.cores,
                memory_mb: body.resources.memory_mb,
            },
            network,
            mounts,
            health_check: health_check(body.health_check),
            rollout: Rollout {
                strategy: non_empty(body.rollout.strategy)
                    .unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
                max_unavailable: body.rollout.max_unavailable,
                auto_rollback: body.rollout.auto_rollback,
            },
        })
    }
}

fn health_check(raw: HealthCheckManifest) -> HealthCheck {
    let seconds_or = |value: u64, fallback: Duration| {
        if value == 0 {
            fallback
        } else {
            Duration::from_secs(value)
        }
    };

    HealthCheck {
        kind: non_empty(raw.kind),
        url: non_empty(raw.url),
        timeout: seconds_or(raw.timeout_seconds, DEFAULT_HEALTH_TIMEOUT),
        interval: seconds_or(raw.interval_seconds, DEFAULT_HEALTH_INTERVAL),
        healthy_threshold: if raw.healthy_threshold == 0 {
            DEFAULT_HEALTHY_THRESHOLD
        } else {
            raw.healthy_threshold
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether a path names a spec file by extension.
fn is_spec_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Load every `*.yml` / `*.yaml` spec in `dir`, sorted by file name.
///
/// Subdirectories are ignored. The first file that fails to parse or
/// validate aborts the load, with the file name attached to the error.
pub fn load_service_specs(dir: &Path) -> Result<Vec<ServiceSpec>, SpecError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| SpecError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| SpecError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_spec_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            ServiceSpec::load(path).map_err(|source| SpecError::InFile {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                source: Box::new(source),
            })
        })
        .collect()
}
