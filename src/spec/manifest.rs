// ABOUTME: Raw YAML shape of a service declaration, before validation.
// ABOUTME: Every required field is optional here so validation can name what is missing.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceManifest {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: MetadataManifest,
    #[serde(default)]
    pub spec: BodyManifest,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MetadataManifest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BodyManifest {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub ctid: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub pull_policy: Option<String>,
    #[serde(default)]
    pub resources: ResourcesManifest,
    #[serde(default)]
    pub network: Option<NetworkManifest>,
    #[serde(default)]
    pub mounts: Vec<MountManifest>,
    #[serde(default)]
    pub health_check: HealthCheckManifest,
    #[serde(default)]
    pub rollout: RolloutManifest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourcesManifest {
    #[serde(default)]
    pub cores: u32,
    #[serde(default, rename = "memoryMB")]
    pub memory_mb: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct NetworkManifest {
    #[serde(default)]
    pub bridge: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub gw: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MountManifest {
    pub host: String,
    pub guest: String,
    #[serde(default)]
    pub options: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthCheckManifest {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub interval_seconds: u64,
    #[serde(default)]
    pub healthy_threshold: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RolloutManifest {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub max_unavailable: u32,
    #[serde(default)]
    pub auto_rollback: bool,
}
