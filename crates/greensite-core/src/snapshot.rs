//! Local store snapshot
//!
//! The full local state is persisted as one JSON file under the data
//! directory so a restart renders instantly from the last-known copy,
//! without a network round trip. Uses atomic writes (write to temp file,
//! then rename) to prevent corruption.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{ContentSettings, SiteSettings};

/// On-disk form of the local store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub site: SiteSettings,
    pub content: ContentSettings,
}

/// Persistence handler for [`Snapshot`]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a handler writing to the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Check if a snapshot exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the snapshot
    ///
    /// Returns `None` if the file doesn't exist. A file that exists but
    /// cannot be parsed is an error; the caller decides whether to start
    /// from defaults.
    pub fn load(&self) -> CoreResult<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|e| CoreError::Snapshot {
            path: self.path.clone(),
            source: e,
        })?;

        let snapshot = serde_json::from_slice(&bytes).map_err(|e| CoreError::SnapshotFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })?;

        Ok(Some(snapshot))
    }

    /// Save the snapshot using an atomic write
    pub fn save(&self, snapshot: &Snapshot) -> CoreResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CoreError::codec("snapshot", e))?;

        atomic_write(&self.path, &bytes).map_err(|e| CoreError::Snapshot {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file in the same directory (for atomic rename)
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}
