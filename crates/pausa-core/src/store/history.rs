//! Session history persistence.
//!
//! A bounded, newest-first JSON list of completed or stopped sessions.
//! Guarded by an in-process mutex only; two processes appending at the same
//! time can race. That weak cross-process boundary is accepted and
//! documented rather than papered over with a file lock.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::timer::SessionType;

use super::{data_dir, write_atomic};

const HISTORY_FILE: &str = "session_history.json";

/// Maximum number of records kept on disk.
pub const HISTORY_CAPACITY: usize = 100;

/// One completed or stopped session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub session_type: SessionType,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub completed: bool,
}

/// File-backed, capacity-bounded session history.
pub struct HistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryStore {
    /// Store backed by an explicit file path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store backed by the shared history file under the data directory.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self::new(data_dir()?.join(HISTORY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepend a record, truncating to [`HISTORY_CAPACITY`].
    pub fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.load_all()?;
        records.insert(0, record);
        records.truncate(HISTORY_CAPACITY);
        self.save_all(&records)
    }

    /// Up to `n` newest-first records. Never mutates the store.
    pub fn recent(&self, n: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.load_all()?;
        records.truncate(n);
        Ok(records)
    }

    fn load_all(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save_all(&self, records: &[HistoryRecord]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(records).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(completed: bool) -> HistoryRecord {
        let now = Utc::now();
        HistoryRecord {
            session_type: SessionType::Work,
            duration_ms: 1_500_000,
            started_at: now,
            ended_at: now,
            completed,
        }
    }

    fn temp_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join(HISTORY_FILE));
        (dir, store)
    }

    #[test]
    fn recent_on_empty_store_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn append_is_newest_first() {
        let (_dir, store) = temp_store();
        store.append(record(false)).unwrap();
        store.append(record(true)).unwrap();

        let records = store.recent(10).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].completed);
        assert!(!records[1].completed);
    }

    #[test]
    fn capacity_is_enforced() {
        let (_dir, store) = temp_store();
        for _ in 0..HISTORY_CAPACITY + 5 {
            store.append(record(true)).unwrap();
        }
        assert_eq!(store.recent(usize::MAX).unwrap().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn recent_limits_without_mutating() {
        let (_dir, store) = temp_store();
        for _ in 0..5 {
            store.append(record(true)).unwrap();
        }
        assert_eq!(store.recent(2).unwrap().len(), 2);
        assert_eq!(store.recent(10).unwrap().len(), 5);
    }
}
