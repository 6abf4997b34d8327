#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Publishing and reading the leaderboard snapshot file.
//!
//! A snapshot is written as pretty-printed JSON to a temporary file next to
//! the target and then renamed over it. Readers therefore see either the
//! previous snapshot or the new one, never a partial write. A failed run
//! leaves the previous file untouched.

pub mod paths;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use leaderboard_stats_models::Snapshot;

/// Errors that can occur while writing or reading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot could not be persisted.
    #[error("failed to write snapshot {}: {source}", path.display())]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file could not be read.
    #[error("failed to read snapshot {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("snapshot JSON error in {}: {source}", path.display())]
    Json {
        /// File involved.
        path: PathBuf,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// Writes `snapshot` to `path`, replacing any previous snapshot.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`SnapshotError::Write`] on any I/O failure. The previous file,
/// if any, is left as it was.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let write_err = |source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut json = serde_json::to_string_pretty(snapshot).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        paths::ensure_dir(parent).map_err(write_err)?;
    }

    let tmp_path = paths::temp_path_for(path);
    let result = write_and_sync(&tmp_path, json.as_bytes())
        .and_then(|()| std::fs::rename(&tmp_path, path));

    if let Err(e) = result {
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path).ok();
        }
        return Err(write_err(e));
    }

    log::info!(
        "Wrote {} with {} players",
        path.display(),
        snapshot.rows.len()
    );
    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Reads the snapshot at `path`.
///
/// Derived values in the file are ignored and recomputed from the counts.
///
/// # Errors
///
/// Returns [`SnapshotError::Read`] if the file cannot be read and
/// [`SnapshotError::Json`] if it is not a snapshot.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}
