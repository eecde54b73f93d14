// ABOUTME: Image digest value as resolved by the registry or pinned in a spec.
// ABOUTME: Recognizes content-addressed references with or without an '@' prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithms accepted as a content-addressed prefix.
const DIGEST_ALGORITHMS: &[&str] = &["sha256:", "sha512:"];

/// The image identity applied to a container.
///
/// Usually a content digest such as `sha256:...`. Under the `never` pull
/// policy a spec's tag is trusted as-is, so a `Digest` may also carry a
/// plain tag; [`Digest::is_content_addressed`] tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a pinned digest reference, accepting `sha256:..` and `@sha256:..`.
    ///
    /// Returns `None` when the value is not content-addressed.
    pub fn from_pinned(value: &str) -> Option<Self> {
        let bare = value.strip_prefix('@').unwrap_or(value);
        Self::looks_content_addressed(bare).then(|| Self(bare.to_string()))
    }

    /// Whether `value` is a pinned digest reference (with or without `@`).
    pub fn is_pinned(value: &str) -> bool {
        Self::from_pinned(value).is_some()
    }

    pub fn is_content_addressed(&self) -> bool {
        Self::looks_content_addressed(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn looks_content_addressed(value: &str) -> bool {
        DIGEST_ALGORITHMS
            .iter()
            .any(|alg| value.len() > alg.len() && value.starts_with(alg))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
