// ABOUTME: Numeric container identity used by the hypervisor.
// ABOUTME: Always positive; the key for runtime calls and state entries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CtidError {
    #[error("container id must be > 0, got {0}")]
    NotPositive(i64),

    #[error("container id out of range: {0}")]
    OutOfRange(i64),

    #[error("invalid container id: {0:?}")]
    Invalid(String),
}

/// A hypervisor container identity.
///
/// Unique per host. Zero and negative values are rejected at construction,
/// so any `Ctid` in hand is safe to pass to the runtime adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ctid(u32);

impl Ctid {
    pub fn new(value: i64) -> Result<Self, CtidError> {
        if value <= 0 {
            return Err(CtidError::NotPositive(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| CtidError::OutOfRange(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Ctid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ctid {
    type Err = CtidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| CtidError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

impl Serialize for Ctid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ctid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(Ctid::new(0), Err(CtidError::NotPositive(0)));
        assert_eq!(Ctid::new(-4), Err(CtidError::NotPositive(-4)));
    }

    #[test]
    fn rejects_values_past_u32() {
        assert!(matches!(
            Ctid::new(i64::from(u32::MAX) + 1),
            Err(CtidError::OutOfRange(_))
        ));
    }

    #[test]
    fn parses_from_string() {
        let ctid: Ctid = "160".parse().unwrap();
        assert_eq!(ctid.get(), 160);
        assert!("abc".parse::<Ctid>().is_err());
    }

    #[test]
    fn serde_roundtrips_as_number() {
        let ctid = Ctid::new(160).unwrap();
        assert_eq!(serde_json::to_string(&ctid).unwrap(), "160");
        assert!(serde_json::from_str::<Ctid>("0").is_err());
    }
}
