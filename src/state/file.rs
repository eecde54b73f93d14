// ABOUTME: File-backed state store: one JSON file per container identity.
// ABOUTME: Every read goes to disk under a per-identity lock; files may be edited externally.

use super::{StateEntry, StateError, StateStore};
use crate::types::Ctid;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// State store persisting `<dir>/<ctid>.json`.
///
/// The file is the only source of truth: an operator may write or delete
/// an entry while the store is open and the next call sees it. The index
/// lock is only held long enough to find or insert an identity's lock;
/// that lock covers the file I/O, so unrelated identities never contend.
/// Writes go to a temporary file and are renamed into place, so a reader
/// never observes a half-written entry.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
    locks: Mutex<HashMap<Ctid, Arc<Mutex<()>>>>,
}

impl FileStateStore {
    /// Open the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StateError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StateError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn path(&self, ctid: Ctid) -> PathBuf {
        self.dir.join(format!("{ctid}.json"))
    }

    fn lock_for(&self, ctid: Ctid) -> Arc<Mutex<()>> {
        self.locks.lock().entry(ctid).or_default().clone()
    }

    fn read_file(&self, ctid: Ctid) -> Result<Option<StateEntry>, StateError> {
        let data = match std::fs::read(self.path(ctid)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StateError::Read { ctid, source }),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| StateError::Decode { ctid, source })
    }

    fn write_file(&self, mut entry: StateEntry) -> Result<StateEntry, StateError> {
        let ctid = entry.ctid;
        entry.updated_at = Utc::now();
        let data = serde_json::to_vec_pretty(&entry)
            .map_err(|source| StateError::Encode { ctid, source })?;

        let path = self.path(ctid);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data).map_err(|source| StateError::Write { ctid, source })?;
        std::fs::rename(&tmp, &path).map_err(|source| StateError::Write { ctid, source })?;
        Ok(entry)
    }
}

impl StateStore for FileStateStore {
    fn load(&self, ctid: Ctid) -> Result<Option<StateEntry>, StateError> {
        let lock = self.lock_for(ctid);
        let _guard = lock.lock();
        self.read_file(ctid)
    }

    fn save(&self, entry: StateEntry) -> Result<StateEntry, StateError> {
        let lock = self.lock_for(entry.ctid);
        let _guard = lock.lock();
        self.write_file(entry)
    }

    fn remove(&self, ctid: Ctid) -> Result<(), StateError> {
        let lock = self.lock_for(ctid);
        let _guard = lock.lock();
        match std::fs::remove_file(self.path(ctid)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Remove { ctid, source }),
        }
    }

    fn update(
        &self,
        ctid: Ctid,
        apply: &mut dyn FnMut(&mut StateEntry),
    ) -> Result<Option<StateEntry>, StateError> {
        let lock = self.lock_for(ctid);
        let _guard = lock.lock();
        let Some(mut entry) = self.read_file(ctid)? else {
            return Ok(None);
        };
        apply(&mut entry);
        entry.ctid = ctid;
        self.write_file(entry).map(Some)
    }

    fn list(&self) -> Result<Vec<StateEntry>, StateError> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|source| StateError::List {
            path: self.dir.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| StateError::List {
                path: self.dir.clone(),
                source,
            })?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(ctid) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Ctid>().ok())
            {
                ids.push(ctid);
            }
        }
        ids.sort();

        let mut entries = Vec::with_capacity(ids.len());
        for ctid in ids {
            if let Some(entry) = self.load(ctid)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
