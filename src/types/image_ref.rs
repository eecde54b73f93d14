// ABOUTME: Image repository names as declared in service specs.
// ABOUTME: Validates the character set and builds tag or digest references.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageNameError {
    #[error("image name cannot be empty")]
    Empty,

    #[error("invalid character in image name: {0}")]
    InvalidChar(char),

    #[error("image name must not carry a digest: {0}")]
    HasDigest(String),
}

/// A repository reference without tag or digest, e.g. `ghcr.io/org/app`.
///
/// Registry ports (`localhost:5000/app`) are allowed; a trailing `@digest`
/// is not, since pins belong in the spec's `tag` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName(String);

impl ImageName {
    pub fn parse(input: &str) -> Result<Self, ImageNameError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageNameError::Empty);
        }

        if input.contains('@') {
            return Err(ImageNameError::HasDigest(input.to_string()));
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_') {
                return Err(ImageNameError::InvalidChar(c));
            }
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a full reference for `tag`.
    ///
    /// Digest tags produce `image@sha256:..` (an existing `@` is not
    /// doubled); anything else produces `image:tag`.
    pub fn reference(&self, tag: &str) -> String {
        if let Some(bare) = tag.strip_prefix('@') {
            format!("{}@{}", self.0, bare)
        } else if super::Digest::is_pinned(tag) {
            format!("{}@{}", self.0, tag)
        } else {
            format!("{}:{}", self.0, tag)
        }
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tag_reference() {
        let image = ImageName::parse("ghcr.io/org/app").unwrap();
        assert_eq!(image.reference("main"), "ghcr.io/org/app:main");
    }

    #[test]
    fn builds_digest_reference_with_or_without_at() {
        let image = ImageName::parse("ghcr.io/org/app").unwrap();
        assert_eq!(image.reference("sha256:abc"), "ghcr.io/org/app@sha256:abc");
        assert_eq!(image.reference("@sha256:abc"), "ghcr.io/org/app@sha256:abc");
    }

    #[test]
    fn registry_port_is_allowed() {
        assert!(ImageName::parse("localhost:5000/app").is_ok());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(ImageName::parse("  "), Err(ImageNameError::Empty));
        assert_eq!(
            ImageName::parse("my app"),
            Err(ImageNameError::InvalidChar(' '))
        );
        assert!(matches!(
            ImageName::parse("app@sha256:abc"),
            Err(ImageNameError::HasDigest(_))
        ));
    }
}
