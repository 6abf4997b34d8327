//! Import of a manually pasted members dataset.
//!
//! When scraping is not an option the club's stats can be pasted as the raw
//! JSON returned by the game's members endpoint:
//!
//! ```json
//! { "members": [ { "name": "...", "gamesPlayed": "12", "goals": "3", "assists": 4 } ] }
//! ```
//!
//! Counts may be numbers or numeric strings. Anything else reads as zero
//! and is flagged as defaulted.

use leaderboard_stats_models::{PASTE_ORIGIN, PlayerRecord, PlayerTotals};
use serde_json::Value;

/// Characters of input echoed back when the JSON cannot be parsed.
const PREVIEW_LEN: usize = 120;

/// Errors that can occur while importing pasted data.
#[derive(Debug, thiserror::Error)]
pub enum PasteError {
    /// Nothing was pasted.
    #[error("pasted input is empty; paste the full members JSON")]
    Empty,

    /// The input is not JSON.
    #[error("could not parse pasted JSON (starts with: {preview}): {source}")]
    InvalidJson {
        /// First characters of the input, whitespace collapsed.
        preview: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The JSON has no `members` array.
    #[error("pasted JSON does not contain a members[] array")]
    MissingMembers,
}

/// Parses pasted members JSON into unranked records.
///
/// # Errors
///
/// Returns [`PasteError`] if the input is empty, not JSON, or lacks a
/// `members` array. Individual malformed members never fail the import.
pub fn parse_pasted_members(raw: &str) -> Result<Vec<PlayerRecord>, PasteError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PasteError::Empty);
    }

    let data: Value = serde_json::from_str(raw).map_err(|source| PasteError::InvalidJson {
        preview: preview(raw),
        source,
    })?;

    let members = data
        .get("members")
        .and_then(Value::as_array)
        .ok_or(PasteError::MissingMembers)?;

    let records: Vec<PlayerRecord> = members.iter().map(member_to_record).collect();
    log::info!("Parsed {} pasted members", records.len());
    Ok(records)
}

fn member_to_record(member: &Value) -> PlayerRecord {
    let name = match member.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let totals = PlayerTotals {
        games: member.get("gamesPlayed").and_then(to_count),
        goals: member.get("goals").and_then(to_count),
        assists: member.get("assists").and_then(to_count),
    };
    PlayerRecord::from_totals(name, totals, PASTE_ORIGIN)
}

/// Reads a JSON number or numeric string as a non-negative whole count.
fn to_count(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v).ok();
            }
            n.as_f64()?
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<u32>() {
                return Some(v);
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    whole_count(number)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_count(number: f64) -> Option<u32> {
    let in_range = number.is_finite() && number >= 0.0 && number <= f64::from(u32::MAX);
    (in_range && number.fract() == 0.0).then(|| number as u32)
}

fn preview(raw: &str) -> String {
    let head: String = raw.chars().take(PREVIEW_LEN).collect();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}
