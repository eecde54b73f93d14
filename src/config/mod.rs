// ABOUTME: Operator configuration parsed from rollkeeper.yml.
// ABOUTME: Registry credentials, runtime adapter, state directory, runner and reconciler settings.

mod env_value;

pub use env_value::{EnvValue, resolve_optional};

use crate::deploy::{ReconcilerOptions, UnknownDigestPolicy};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "rollkeeper.yml";
pub const CONFIG_FILENAME_ALT: &str = "rollkeeper.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub state: StateConfig,

    pub runner: RunnerConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub username: Option<EnvValue>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    /// Registries reached over plain HTTP.
    #[serde(default)]
    pub insecure: Vec<String>,
}

impl RegistryConfig {
    /// Resolved username and password, or `None` for anonymous access.
    pub fn credentials(&self) -> Result<Option<(String, String)>> {
        let username = resolve_optional(self.username.as_ref())?;
        let password = resolve_optional(self.password.as_ref())?;
        Ok(match (username, password) {
            (None, None) => None,
            (u, p) => Some((u.unwrap_or_default(), p.unwrap_or_default())),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeMode {
    /// Drive containers through the `pct` CLI.
    #[default]
    Cli,
    /// Simulate containers in memory; nothing on the host is touched.
    DryRun,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub mode: RuntimeMode,

    #[serde(default = "default_pct_path")]
    pub pct_path: PathBuf,

    /// Only specs targeting this node are reconciled.
    #[serde(default)]
    pub node: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            mode: RuntimeMode::default(),
            pct_path: default_pct_path(),
            node: None,
        }
    }
}

fn default_pct_path() -> PathBuf {
    PathBuf::from("pct")
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".state")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    pub services_path: PathBuf,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default, with = "humantime_serde")]
    pub readiness_timeout: Option<Duration>,

    #[serde(default)]
    pub unknown_digest: UnknownDigestPolicy,
}

impl ReconcilerConfig {
    pub fn options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            readiness_timeout: self.readiness_timeout,
            unknown_digest: self.unknown_digest,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `rollkeeper.yml` or `rollkeeper.yaml` from `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [dir.join(CONFIG_FILENAME), dir.join(CONFIG_FILENAME_ALT)];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.runner.services_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "runner.services_path must not be empty".to_string(),
            ));
        }
        if self.runner.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "runner.interval must be greater than zero".to_string(),
            ));
        }
        if self.state.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "state.path must not be empty".to_string(),
            ));
        }
        if self.reconciler.readiness_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig(
                "reconciler.readiness_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
