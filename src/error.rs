// ABOUTME: Application-wide error types for rollkeeper.
// ABOUTME: Covers configuration, spec loading, and the outcome of a reconciliation pass.

use crate::health::TransportError;
use crate::spec::SpecError;
use crate::state::StateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("load service specs: {0}")]
    Spec(#[from] SpecError),

    #[error("state store: {0}")]
    State(#[from] StateError),

    #[error("health check client: {0}")]
    Health(#[from] TransportError),

    #[error("{failed} of {total} services failed to reconcile")]
    ReconcileFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
