// ABOUTME: Service names from spec metadata.
// ABOUTME: Doubles as the container hostname, so it must be a valid RFC 1123 label.

use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("service name cannot start or end with a hyphen")]
    EdgeHyphen,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if value.len() > MAX_LEN {
            return Err(ServiceNameError::TooLong);
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(ServiceNameError::EdgeHyphen);
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ServiceNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_label() {
        assert_eq!(
            ServiceName::new("composer-web").unwrap().as_str(),
            "composer-web"
        );
    }

    #[test]
    fn rejects_uppercase_and_edges() {
        assert_eq!(
            ServiceName::new("Composer"),
            Err(ServiceNameError::InvalidChar('C'))
        );
        assert_eq!(
            ServiceName::new("-web"),
            Err(ServiceNameError::EdgeHyphen)
        );
        assert_eq!(
            ServiceName::new(&"a".repeat(64)),
            Err(ServiceNameError::TooLong)
        );
    }
}
