//! Persistent session state.
//!
//! One JSON snapshot per process-visible session, shared across
//! independently-launched processes. Every process reads it on startup and
//! writes it after every timer mutation; there is no cross-process lock, so
//! consistency is last-writer-wins.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::timer::SessionSnapshot;

use super::{data_dir, write_atomic};

const STATE_FILE: &str = "timer_state.json";

/// File-backed store for the current [`SessionSnapshot`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by an explicit file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store backed by the shared state file under the data directory.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self::new(data_dir()?.join(STATE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and atomically replace the shared state file.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &bytes)
    }

    /// Load the current snapshot. A missing file yields the default Idle
    /// snapshot; an existing but unparseable file is an error.
    pub fn load(&self) -> Result<SessionSnapshot, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionSnapshot::default())
            }
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

    /// Remove the state file. Idempotent if it is already absent.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
