#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Leaderboard ordering.
//!
//! Rows are ordered by goals+assists per match, highest first. Equal rates
//! are broken by matches played, highest first, so a 1.0 rate over 20
//! games ranks above the same rate over 2. Rows that are still equal keep
//! their input order (the sort is stable).

use std::cmp::Ordering;

use leaderboard_stats_models::PlayerRecord;

/// Options for [`rank`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankOptions {
    /// Drop records with fewer matches played than this. `0` keeps all.
    pub min_games: u32,
}

impl RankOptions {
    /// Options with the given minimum games threshold.
    #[must_use]
    pub const fn with_min_games(min_games: u32) -> Self {
        Self { min_games }
    }
}

/// Leaderboard comparison: rate descending, then games descending.
#[must_use]
pub fn compare(a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
    b.rate_per_match()
        .total_cmp(&a.rate_per_match())
        .then_with(|| b.games().cmp(&a.games()))
}

/// Filters by `options.min_games` and sorts into leaderboard order.
#[must_use]
pub fn rank(records: Vec<PlayerRecord>, options: RankOptions) -> Vec<PlayerRecord> {
    let total = records.len();
    let mut rows = filter_min_games(records, options.min_games);
    rows.sort_by(compare);

    if rows.len() < total {
        log::debug!(
            "Ranked {} of {total} players (min games {})",
            rows.len(),
            options.min_games
        );
    }
    rows
}

/// Keeps only records with at least `min_games` matches played.
///
/// Order is preserved, so filtering an already ranked list yields the same
/// result as ranking the filtered records.
#[must_use]
pub fn filter_min_games(records: Vec<PlayerRecord>, min_games: u32) -> Vec<PlayerRecord> {
    if min_games == 0 {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.games() >= min_games)
        .collect()
}

/// Returns `true` if `rows` is in leaderboard order.
#[must_use]
pub fn is_ranked(rows: &[PlayerRecord]) -> bool {
    rows.windows(2)
        .all(|pair| compare(&pair[0], &pair[1]) != Ordering::Greater)
}
