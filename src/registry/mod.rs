// ABOUTME: OCI registry access and pull-policy driven digest resolution.
// ABOUTME: Turns image + tag into the immutable digest a container should run.

mod resolver;

pub use resolver::{DigestResolver, PullPolicy, ResolutionError};

use crate::types::{Digest, ImageName};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use std::time::Duration;

/// Upper bound on a single manifest lookup.
pub const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid image reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("resolve digest for {reference}: {reason}")]
    Lookup { reference: String, reason: String },

    #[error("resolve digest for {reference}: timed out after {}s", .timeout.as_secs())]
    Timeout {
        reference: String,
        timeout: Duration,
    },
}

/// Looks up the current manifest digest for an image tag.
///
/// Implementations must not cache: each call reflects the registry at call
/// time, so a re-pushed tag is noticed on the next pass.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn head_digest(&self, image: &ImageName, tag: &str) -> Result<Digest, RegistryError>;
}

/// Registry client backed by `oci-distribution`.
pub struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
    timeout: Duration,
}

impl OciRegistry {
    /// Basic auth when either credential is present, anonymous otherwise.
    ///
    /// Registries listed in `insecure` are contacted over plain HTTP.
    pub fn with_config(credentials: Option<(String, String)>, insecure: Vec<String>) -> Self {
        let protocol = if insecure.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(insecure)
        };
        let auth = match credentials {
            Some((username, password)) if !username.is_empty() || !password.is_empty() => {
                RegistryAuth::Basic(username, password)
            }
            _ => RegistryAuth::Anonymous,
        };
        Self {
            client: Client::new(ClientConfig {
                protocol,
                ..Default::default()
            }),
            auth,
            timeout: REGISTRY_TIMEOUT,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.auth, RegistryAuth::Anonymous)
    }
}

#[async_trait]
impl RegistryClient for OciRegistry {
    async fn head_digest(&self, image: &ImageName, tag: &str) -> Result<Digest, RegistryError> {
        let reference_str = image.reference(tag);
        let reference: Reference =
            reference_str
                .parse()
                .map_err(|e| RegistryError::InvalidReference {
                    reference: reference_str.clone(),
                    reason: format!("{}", e),
                })?;

        tracing::debug!(reference = %reference_str, "fetching manifest digest");

        let digest = tokio::time::timeout(
            self.timeout,
            self.client.fetch_manifest_digest(&reference, &self.auth),
        )
        .await
        .map_err(|_| RegistryError::Timeout {
            reference: reference_str.clone(),
            timeout: self.timeout,
        })?
        .map_err(|e| RegistryError::Lookup {
            reference: reference_str.clone(),
            reason: e.to_string(),
        })?;

        Ok(Digest::new(digest))
    }
}
