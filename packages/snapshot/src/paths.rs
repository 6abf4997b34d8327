//! Snapshot file locations.

use std::path::{Path, PathBuf};

/// Environment variable overriding [`DEFAULT_SNAPSHOT_PATH`].
pub const SNAPSHOT_PATH_ENV_VAR: &str = "SNAPSHOT_PATH";

/// Where the snapshot is published unless configured otherwise, relative to
/// the working directory.
pub const DEFAULT_SNAPSHOT_PATH: &str = "public/stats.json";

/// Resolves the snapshot path: an explicit path wins, then
/// [`SNAPSHOT_PATH_ENV_VAR`], then [`DEFAULT_SNAPSHOT_PATH`].
#[must_use]
pub fn snapshot_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(
        || {
            std::env::var_os(SNAPSHOT_PATH_ENV_VAR)
                .map_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH), PathBuf::from)
        },
        Path::to_path_buf,
    )
}

/// Sibling path a snapshot is staged at before being renamed into place.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
