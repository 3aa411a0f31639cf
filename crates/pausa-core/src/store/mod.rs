mod config;
mod history;
mod state;

pub use config::Config;
pub use history::{HistoryRecord, HistoryStore, HISTORY_CAPACITY};
pub use state::StateStore;

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Returns `~/.config/pausa[-dev]/` based on PAUSA_ENV.
///
/// Set PAUSA_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PAUSA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pausa-dev")
    } else {
        base_dir.join("pausa")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Write `bytes` to `path` through a temp file in the same directory
/// followed by an atomic rename, so a concurrently-reading process never
/// observes a partially-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.write_all(bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.persist(path).map_err(|e| StoreError::Write {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
