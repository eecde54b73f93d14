// ABOUTME: Errors for service spec parsing and validation.
// ABOUTME: ValidationError is raised before any reconciliation starts.

use crate::types::{CtidError, ImageNameError, ServiceNameError};
use std::path::PathBuf;
use thiserror::Error;

/// A declaration that parsed but does not describe a usable service.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("metadata.name is required")]
    MissingName,

    #[error("metadata.name is invalid: {0}")]
    InvalidName(#[from] ServiceNameError),

    #[error("spec.ctid is required")]
    MissingCtid,

    #[error("spec.ctid is invalid: {0}")]
    InvalidCtid(#[from] CtidError),

    #[error("spec.node is required")]
    MissingNode,

    #[error("spec.image is required")]
    MissingImage,

    #[error("spec.image is invalid: {0}")]
    InvalidImage(#[from] ImageNameError),

    #[error("spec.network.bridge is required when network is set")]
    MissingBridge,

    #[error("spec.mounts entries need both host and guest paths")]
    IncompleteMount,
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("parse service spec: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{file}: {source}")]
    InFile {
        file: String,
        source: Box<SpecError>,
    },
}
