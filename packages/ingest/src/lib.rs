#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch side of the club leaderboard.
//!
//! Produces the published snapshot either by scraping the club's pages
//! ([`scrape_and_publish`]) or from a pasted members dataset
//! ([`import_and_publish`]). Both paths rank with the same rules and
//! publish through [`leaderboard_snapshot::write_snapshot`], so a failed
//! run never touches the previous file.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use leaderboard_ranking::{RankOptions, rank};
use leaderboard_scraper::PageFetcher;
use leaderboard_snapshot::SnapshotError;
use leaderboard_source::club::{ClubConfigError, ClubDefinition};
use leaderboard_source::paste::{PasteError, parse_pasted_members};
use leaderboard_source::pipeline::{PipelineError, PipelineOptions, build_snapshot};
use leaderboard_source::progress::ProgressCallback;
use leaderboard_stats_models::Snapshot;

/// Environment variable holding pasted members JSON when no file is given.
pub const PASTE_ENV_VAR: &str = "EA_JSON";

/// Errors that fail a batch run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The club definition could not be loaded.
    #[error(transparent)]
    Config(#[from] ClubConfigError),

    /// Scraping failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The pasted dataset was rejected.
    #[error(transparent)]
    Paste(#[from] PasteError),

    /// The snapshot could not be published or read.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The paste file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Input {
        /// Path that was read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Neither a paste file nor [`PASTE_ENV_VAR`] was provided.
    #[error("no pasted data: pass --file or set {PASTE_ENV_VAR}")]
    NoInput,
}

/// Scrapes the club and publishes the ranked snapshot to `output`.
///
/// # Errors
///
/// Returns [`IngestError::Pipeline`] if scraping fails and
/// [`IngestError::Snapshot`] if the file cannot be written. Either way the
/// previously published snapshot is left intact.
pub async fn scrape_and_publish(
    club: &ClubDefinition,
    fetcher: &dyn PageFetcher,
    options: &PipelineOptions,
    progress: &Arc<dyn ProgressCallback>,
    output: &Path,
) -> Result<Snapshot, IngestError> {
    log::info!(
        "Scraping {} ({}) from {}",
        club.name,
        club.club_id,
        club.source
    );
    let snapshot = build_snapshot(club, fetcher, options, progress).await?;
    leaderboard_snapshot::write_snapshot(output, &snapshot)?;
    Ok(snapshot)
}

/// Reads pasted members JSON from `file`, or from [`PASTE_ENV_VAR`] when no
/// file is given.
///
/// # Errors
///
/// Returns [`IngestError::Input`] if the file cannot be read and
/// [`IngestError::NoInput`] if there is nothing to read.
pub fn read_paste_input(file: Option<&Path>) -> Result<String, IngestError> {
    if let Some(path) = file {
        return std::fs::read_to_string(path).map_err(|source| IngestError::Input {
            path: path.to_path_buf(),
            source,
        });
    }
    std::env::var(PASTE_ENV_VAR).map_err(|_| IngestError::NoInput)
}

/// Parses a pasted members dataset, ranks it, and publishes it to `output`.
///
/// # Errors
///
/// Returns [`IngestError::Paste`] if the dataset is rejected and
/// [`IngestError::Snapshot`] if the file cannot be written.
pub fn import_and_publish(
    raw: &str,
    options: RankOptions,
    output: &Path,
) -> Result<Snapshot, IngestError> {
    let records = parse_pasted_members(raw)?;
    let snapshot = Snapshot::new(Utc::now(), rank(records, options));

    let degraded = snapshot.degraded_count();
    if degraded > 0 {
        log::warn!("{degraded} pasted members have non-numeric stats, read as 0");
    }

    leaderboard_snapshot::write_snapshot(output, &snapshot)?;
    Ok(snapshot)
}

/// Renders a snapshot as a plain-text table.
#[must_use]
pub fn format_table(snapshot: &Snapshot) -> String {
    let name_width = snapshot
        .rows
        .iter()
        .map(|r| r.name().chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Generated {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "{:>3}  {:<name_width$}  {:>5}  {:>5}  {:>7}  {:>4}  {:>8}",
        "#", "NAME", "GAMES", "GOALS", "ASSISTS", "G+A", "G+A/GP"
    );
    let _ = writeln!(out, "{}", "-".repeat(name_width + 44));

    for (idx, row) in snapshot.rows.iter().enumerate() {
        let flag = if row.provenance().is_degraded() {
            " *"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>3}  {:<name_width$}  {:>5}  {:>5}  {:>7}  {:>4}  {:>8.4}{flag}",
            idx + 1,
            row.name(),
            row.games(),
            row.goals(),
            row.assists(),
            row.combined(),
            row.rate_per_match(),
        );
    }

    if snapshot.rows.is_empty() {
        out.push_str("(no players)\n");
    } else if snapshot.degraded_count() > 0 {
        out.push_str("* some stats could not be read and count as 0\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use leaderboard_stats_models::PlayerRecord;

    use super::*;

    #[test]
    fn table_formats_rates_to_four_decimals() {
        let snapshot = Snapshot::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            vec![
                PlayerRecord::new("Alpha", 3, 1, 1, "a"),
                PlayerRecord::new("Bravo", 0, 0, 0, "b"),
            ],
        );
        let table = format_table(&snapshot);
        assert!(table.starts_with("Generated 2025-03-01 12:00:00 UTC\n"));
        assert!(table.contains("0.6667"));
        assert!(table.contains("0.0000"));
        assert!(!table.contains("(no players)"));
    }

    #[test]
    fn table_marks_defaulted_rows() {
        let snapshot = Snapshot::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            vec![PlayerRecord::from_totals(
                "Alpha",
                leaderboard_stats_models::PlayerTotals {
                    games: Some(2),
                    goals: None,
                    assists: Some(1),
                },
                "a",
            )],
        );
        let table = format_table(&snapshot);
        assert!(table.contains("0.5000 *"));
        assert!(table.ends_with("count as 0\n"));
    }

    #[test]
    fn empty_table_says_so() {
        let snapshot = Snapshot::new(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(), vec![]);
        assert!(format_table(&snapshot).ends_with("(no players)\n"));
    }

    #[test]
    fn paste_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.json");
        std::fs::write(&path, "{\"members\":[]}").unwrap();
        assert_eq!(read_paste_input(Some(&path)).unwrap(), "{\"members\":[]}");

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            read_paste_input(Some(&missing)),
            Err(IngestError::Input { .. })
        ));
    }
}
