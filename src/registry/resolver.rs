// ABOUTME: Pull-policy rules for turning a spec's tag into a target digest.
// ABOUTME: Pinned digests and the `never` policy short-circuit the registry.

use super::{RegistryClient, RegistryError};
use crate::types::{Digest, ImageName};
use std::str::FromStr;
use std::sync::Arc;

/// How a spec's tag is turned into a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Resolve the tag to its current digest on every pass.
    Digest,
    /// Same lookup as `Digest`; kept as a distinct spelling.
    Tag,
    /// Trust the tag as-is, never contact the registry.
    Never,
}

impl FromStr for PullPolicy {
    type Err = ResolutionError;

    /// Case-insensitive; an empty string means `digest`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "digest" => Ok(PullPolicy::Digest),
            "tag" => Ok(PullPolicy::Tag),
            "never" => Ok(PullPolicy::Never),
            _ => Err(ResolutionError::UnsupportedPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("unsupported pullPolicy {0:?}")]
    UnsupportedPolicy(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Applies the pull policy, consulting the registry only when required.
#[derive(Clone)]
pub struct DigestResolver {
    registry: Arc<dyn RegistryClient>,
}

impl DigestResolver {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Resolve `image:tag` under `pull_policy`.
    ///
    /// A tag that is already a digest reference (`sha256:..` or
    /// `@sha256:..`) is returned as that digest without a network call, as
    /// is any tag under `never`. An unsupported policy fails before the
    /// registry is touched.
    pub async fn resolve(
        &self,
        image: &ImageName,
        tag: &str,
        pull_policy: &str,
    ) -> Result<Digest, ResolutionError> {
        if let Some(pinned) = Digest::from_pinned(tag) {
            return Ok(pinned);
        }

        match pull_policy.parse::<PullPolicy>()? {
            PullPolicy::Never => Ok(Digest::new(tag)),
            PullPolicy::Digest | PullPolicy::Tag => {
                Ok(self.registry.head_digest(image, tag).await?)
            }
        }
    }
}
