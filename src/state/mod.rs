// ABOUTME: Durable record of the digest last applied to each container identity.
// ABOUTME: The engine's only trusted link between an identity and its deployed image.

mod file;

pub use file::FileStateStore;

use crate::types::{Ctid, Digest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status recorded alongside a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Running,
    Stopped,
    /// A status string this version does not recognize.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Running => write!(f, "running"),
            EntryStatus::Stopped => write!(f, "stopped"),
            EntryStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One persisted record per container identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub ctid: Ctid,
    pub digest: Digest,
    pub status: EntryStatus,
    pub node: String,
    /// Stamped by the store on every write.
    #[serde(rename = "update")]
    pub updated_at: DateTime<Utc>,
}

impl StateEntry {
    pub fn new(ctid: Ctid, digest: Digest, status: EntryStatus, node: impl Into<String>) -> Self {
        StateEntry {
            ctid,
            digest,
            status,
            node: node.into(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("create state dir {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("read state for {ctid}: {source}")]
    Read { ctid: Ctid, source: std::io::Error },

    #[error("decode state for {ctid}: {source}")]
    Decode {
        ctid: Ctid,
        source: serde_json::Error,
    },

    #[error("encode state for {ctid}: {source}")]
    Encode {
        ctid: Ctid,
        source: serde_json::Error,
    },

    #[error("write state for {ctid}: {source}")]
    Write { ctid: Ctid, source: std::io::Error },

    #[error("remove state for {ctid}: {source}")]
    Remove { ctid: Ctid, source: std::io::Error },

    #[error("list state dir {}: {source}", .path.display())]
    List {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Durable storage for [`StateEntry`] records, keyed by [`Ctid`].
///
/// Every operation is atomic per identity: concurrent callers touching the
/// same identity are serialized, callers on different identities are not.
/// Implementations never hold a lock across calls, so the engine can call
/// the runtime or the readiness gate between store operations freely.
pub trait StateStore: Send + Sync {
    /// Load the entry for `ctid`, or `None` if nothing was recorded.
    fn load(&self, ctid: Ctid) -> Result<Option<StateEntry>, StateError>;

    /// Persist `entry`, stamping `updated_at`. Returns the stored record.
    fn save(&self, entry: StateEntry) -> Result<StateEntry, StateError>;

    /// Delete the entry for `ctid`. Removing a missing entry is not an error.
    fn remove(&self, ctid: Ctid) -> Result<(), StateError>;

    /// Read-modify-write the entry for `ctid` under its lock.
    ///
    /// Returns `None` without writing when no entry exists.
    fn update(
        &self,
        ctid: Ctid,
        apply: &mut dyn FnMut(&mut StateEntry),
    ) -> Result<Option<StateEntry>, StateError>;

    /// All recorded entries, ordered by identity.
    fn list(&self) -> Result<Vec<StateEntry>, StateError>;
}
