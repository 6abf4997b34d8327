#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the club leaderboard server.
//!
//! Kept apart from the snapshot types so the HTTP contract can change
//! without touching the published file format.

use chrono::{DateTime, Utc};
use leaderboard_stats_models::PlayerRecord;
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/ga-per-match`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQueryParams {
    /// Minimum matches played, as sent by the client. Parsed by the
    /// handler so a malformed value can be answered with a JSON error.
    pub min_games: Option<String>,
}

/// Response of `GET /api/ga-per-match`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLeaderboard {
    /// Upstream club identifier.
    pub club_id: String,
    /// Upstream site label.
    pub source: String,
    /// When the underlying pipeline run completed.
    pub generated_at: DateTime<Utc>,
    /// Threshold that was applied.
    pub min_games: u32,
    /// Whether the rows came from the cache.
    pub cached: bool,
    /// Ranked rows.
    pub rows: Vec<PlayerRecord>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `true` while the server answers.
    pub healthy: bool,
    /// Server crate version.
    pub version: String,
}

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Shared site password.
    #[serde(default)]
    pub password: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOk {
    /// Always `true`.
    pub ok: bool,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn leaderboard_uses_camel_case() {
        let body = ApiLeaderboard {
            club_id: "420295".to_string(),
            source: "proclubshead".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            min_games: 2,
            cached: false,
            rows: vec![PlayerRecord::new("Alpha", 4, 1, 1, "a")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["clubId"], "420295");
        assert_eq!(json["minGames"], 2);
        assert_eq!(json["cached"], false);
        assert_eq!(json["generatedAt"], "2025-03-01T12:00:00Z");
        assert_eq!(json["rows"][0]["ga"], 2);
        assert_eq!(json["rows"][0]["gaPerMatch"], 0.5);
    }

    #[test]
    fn login_request_tolerates_missing_password() {
        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.password.is_empty());
    }
}
