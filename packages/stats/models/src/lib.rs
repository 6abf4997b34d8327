#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Player stat records and the published snapshot format.
//!
//! A [`PlayerRecord`] owns the three raw counts scraped for a player
//! (matches played, goals, assists). The combined G+A value and the
//! per-match rate are never stored: they are computed from the counts on
//! every read, and recomputed when a snapshot is deserialized, so a stale
//! or hand-edited `ga`/`gaPerMatch` in a JSON file can never leak through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Name used when neither the page heading nor the URL yields one.
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";

/// Origin tag for records produced from a manually pasted dataset.
pub const PASTE_ORIGIN: &str = "ea-paste";

/// Whether a count was read from the source or fell back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldSource {
    /// The value was found in the source document.
    #[default]
    Extracted,
    /// The label or value was missing or malformed; the count is zero.
    Defaulted,
}

impl FieldSource {
    /// Derives the source flag from an optional parsed value.
    #[must_use]
    pub const fn of<T>(value: Option<&T>) -> Self {
        if value.is_some() {
            Self::Extracted
        } else {
            Self::Defaulted
        }
    }
}

/// Per-field provenance for the three raw counts of a [`PlayerRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProvenance {
    /// Matches played.
    pub games: FieldSource,
    /// Goals.
    pub goals: FieldSource,
    /// Assists.
    pub assists: FieldSource,
}

impl FieldProvenance {
    /// Returns `true` if any of the counts was defaulted.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        [self.games, self.goals, self.assists].contains(&FieldSource::Defaulted)
    }
}

/// Raw per-player counts as produced by an extractor.
///
/// `None` means the value could not be read; it becomes `0` with a
/// [`FieldSource::Defaulted`] flag once turned into a [`PlayerRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTotals {
    /// Matches played.
    pub games: Option<u32>,
    /// Goals scored.
    pub goals: Option<u32>,
    /// Assists.
    pub assists: Option<u32>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PlayerRow", from = "PlayerRow")]
pub struct PlayerRecord {
    name: String,
    games: u32,
    goals: u32,
    assists: u32,
    origin: String,
    provenance: FieldProvenance,
}

impl PlayerRecord {
    /// Creates a record whose counts were all read from the source.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        games: u32,
        goals: u32,
        assists: u32,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            name: normalize_name(name.into()),
            games,
            goals,
            assists,
            origin: origin.into(),
            provenance: FieldProvenance::default(),
        }
    }

    /// Creates a record from extracted totals, defaulting missing counts
    /// to zero and flagging them in the provenance.
    #[must_use]
    pub fn from_totals(
        name: impl Into<String>,
        totals: PlayerTotals,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            name: normalize_name(name.into()),
            games: totals.games.unwrap_or(0),
            goals: totals.goals.unwrap_or(0),
            assists: totals.assists.unwrap_or(0),
            origin: origin.into(),
            provenance: FieldProvenance {
                games: FieldSource::of(totals.games.as_ref()),
                goals: FieldSource::of(totals.goals.as_ref()),
                assists: FieldSource::of(totals.assists.as_ref()),
            },
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matches played.
    #[must_use]
    pub const fn games(&self) -> u32 {
        self.games
    }

    /// Goals scored.
    #[must_use]
    pub const fn goals(&self) -> u32 {
        self.goals
    }

    /// Assists.
    #[must_use]
    pub const fn assists(&self) -> u32 {
        self.assists
    }

    /// Profile URL the record was scraped from, or [`PASTE_ORIGIN`].
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Per-field provenance of the raw counts.
    #[must_use]
    pub const fn provenance(&self) -> FieldProvenance {
        self.provenance
    }

    /// Goals plus assists. Widened so the sum of two `u32` counts is exact.
    #[must_use]
    pub const fn combined(&self) -> u64 {
        self.goals as u64 + self.assists as u64
    }

    /// Combined G+A per match played, or `0.0` for a player with no games.
    #[must_use]
    pub fn rate_per_match(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let combined = self.combined() as f64;
            combined / f64::from(self.games)
        }
    }
}

fn normalize_name(name: String) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNKNOWN_PLAYER_NAME.to_string()
    } else if trimmed.len() == name.len() {
        name
    } else {
        trimmed.to_string()
    }
}

/// Wire format of a [`PlayerRecord`].
///
/// `ga` and `ga_per_match` are written for consumers but ignored when
/// reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRow {
    /// Display name.
    pub name: String,
    /// Matches played.
    pub games: u32,
    /// Goals scored.
    pub goals: u32,
    /// Assists.
    pub assists: u32,
    /// Goals plus assists.
    #[serde(default)]
    pub ga: u64,
    /// G+A per match.
    #[serde(default)]
    pub ga_per_match: f64,
    /// Origin of the record.
    #[serde(default)]
    pub source: String,
    /// Per-field provenance. Older snapshots without it read as extracted.
    #[serde(default)]
    pub provenance: FieldProvenance,
}

impl From<PlayerRecord> for PlayerRow {
    fn from(record: PlayerRecord) -> Self {
        let ga = record.combined();
        let ga_per_match = record.rate_per_match();
        Self {
            name: record.name,
            games: record.games,
            goals: record.goals,
            assists: record.assists,
            ga,
            ga_per_match,
            source: record.origin,
            provenance: record.provenance,
        }
    }
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        Self {
            name: normalize_name(row.name),
            games: row.games,
            goals: row.goals,
            assists: row.assists,
            origin: row.source,
            provenance: row.provenance,
        }
    }
}

/// One published leaderboard: ranked rows plus the time they were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// When the pipeline run that produced this snapshot completed.
    #[serde(alias = "updatedAt")]
    pub generated_at: DateTime<Utc>,
    /// Rows in ranking order.
    pub rows: Vec<PlayerRecord>,
}

impl Snapshot {
    /// Creates a snapshot stamped with the given completion time.
    #[must_use]
    pub const fn new(generated_at: DateTime<Utc>, rows: Vec<PlayerRecord>) -> Self {
        Self { generated_at, rows }
    }

    /// Number of rows with at least one defaulted count.
    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.provenance().is_degraded())
            .count()
    }
}
