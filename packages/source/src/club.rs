//! Config-driven club definition.
//!
//! [`ClubDefinition`] captures everything the pipeline needs to know about
//! the tracked club: where its squad page lives, which profile links belong
//! to it, how to talk to the upstream site, and which labels locate each
//! stat. A default is embedded at compile time from `clubs/default.toml`;
//! a file on disk can replace it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use leaderboard_scraper::ScrapeError;
use leaderboard_scraper::fetch::DEFAULT_USER_AGENT;
use leaderboard_scraper::profile::{DEFAULT_LABEL_WINDOW, FieldExtractor, LabelRule, StatField};
use leaderboard_scraper::roster::RosterPattern;
use reqwest::Url;
use serde::Deserialize;

/// The club definition baked into the binary.
const DEFAULT_CLUB_TOML: &str = include_str!("../clubs/default.toml");

/// Environment variable naming a club definition file.
pub const CONFIG_ENV_VAR: &str = "LEADERBOARD_CONFIG";

/// Errors that can occur while loading a club definition.
#[derive(Debug, thiserror::Error)]
pub enum ClubConfigError {
    /// The config file could not be read.
    #[error("failed to read club config {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not match the expected shape.
    #[error("invalid club config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid club config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

// ── Top-level definition ─────────────────────────────────────────────────

/// The club whose roster is scraped and ranked.
#[derive(Debug, Clone, Deserialize)]
pub struct ClubDefinition {
    /// Upstream club identifier (e.g. `"420295"`).
    pub club_id: String,
    /// Human-readable club name.
    pub name: String,
    /// Label for the upstream site, reported by the API (e.g. `"proclubshead"`).
    pub source: String,
    /// Season path segment (e.g. `"26"`).
    pub season: String,
    /// Platform generation prefix (e.g. `"gen5"`).
    pub generation: String,
    /// Origin relative profile links are resolved against.
    pub base_url: String,
    /// Squad listing URL. Derived from the other fields when unset.
    #[serde(default)]
    pub squad_url: Option<String>,
    /// HTTP and concurrency settings.
    #[serde(default)]
    pub scrape: ScrapeSettings,
    /// Label rules, applied in order.
    #[serde(default = "default_labels")]
    pub labels: Vec<LabelConfig>,
}

// ── Scrape settings ──────────────────────────────────────────────────────

/// How the pipeline talks to the upstream site.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSettings {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum profile fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Budget for one whole pipeline run in seconds.
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            pipeline_timeout_secs: default_pipeline_timeout_secs(),
        }
    }
}

impl ScrapeSettings {
    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whole-pipeline timeout.
    #[must_use]
    pub const fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

const fn default_concurrency() -> usize {
    8
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_pipeline_timeout_secs() -> u64 {
    120
}

// ── Label rules ──────────────────────────────────────────────────────────

/// Stat a label rule fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    /// Matches played.
    Games,
    /// Goals.
    Goals,
    /// Assists.
    Assists,
}

impl From<LabelField> for StatField {
    fn from(field: LabelField) -> Self {
        match field {
            LabelField::Games => Self::Games,
            LabelField::Goals => Self::Goals,
            LabelField::Assists => Self::Assists,
        }
    }
}

/// One `[[labels]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    /// Stat this label locates.
    pub field: LabelField,
    /// Label text as it appears on profile pages.
    pub label: String,
    /// Maximum characters between label and value.
    #[serde(default = "default_window")]
    pub window: usize,
}

const fn default_window() -> usize {
    DEFAULT_LABEL_WINDOW
}

fn default_labels() -> Vec<LabelConfig> {
    LabelRule::standard()
        .into_iter()
        .map(|rule| LabelConfig {
            field: match rule.field {
                StatField::Games => LabelField::Games,
                StatField::Goals => LabelField::Goals,
                StatField::Assists => LabelField::Assists,
            },
            label: rule.label,
            window: rule.window,
        })
        .collect()
}

// ── Derived values ───────────────────────────────────────────────────────

impl ClubDefinition {
    /// The squad listing URL.
    #[must_use]
    pub fn squad_url(&self) -> String {
        self.squad_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/club-squad/{}-{}/",
                self.base_url.trim_end_matches('/'),
                self.season,
                self.generation,
                self.club_id
            )
        })
    }

    /// Parsed base origin.
    ///
    /// # Errors
    ///
    /// Returns [`ClubConfigError::Invalid`] if `base_url` is not a URL.
    pub fn base(&self) -> Result<Url, ClubConfigError> {
        Url::parse(&self.base_url).map_err(|e| ClubConfigError::Invalid {
            message: format!("base_url '{}': {e}", self.base_url),
        })
    }

    /// Which squad-page links are this club's profiles.
    #[must_use]
    pub fn roster_pattern(&self) -> RosterPattern {
        RosterPattern {
            season: self.season.clone(),
            generation: self.generation.clone(),
            club_id: self.club_id.clone(),
        }
    }

    /// The configured label rules.
    #[must_use]
    pub fn label_rules(&self) -> Vec<LabelRule> {
        self.labels
            .iter()
            .map(|l| LabelRule {
                field: l.field.into(),
                label: l.label.clone(),
                window: l.window,
            })
            .collect()
    }

    /// Compiles the configured label rules.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Pattern`] if a rule is unusable.
    pub fn field_extractor(&self) -> Result<FieldExtractor, ScrapeError> {
        FieldExtractor::new(&self.label_rules())
    }

    /// Checks that the definition can drive a pipeline run.
    ///
    /// # Errors
    ///
    /// Returns [`ClubConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ClubConfigError> {
        let required = [
            ("club_id", &self.club_id),
            ("season", &self.season),
            ("generation", &self.generation),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ClubConfigError::Invalid {
                    message: format!("{field} is empty"),
                });
            }
        }
        self.base()?;
        Url::parse(&self.squad_url()).map_err(|e| ClubConfigError::Invalid {
            message: format!("squad_url '{}': {e}", self.squad_url()),
        })?;
        if self.scrape.concurrency == 0 {
            return Err(ClubConfigError::Invalid {
                message: "scrape.concurrency must be at least 1".to_string(),
            });
        }
        let timeouts = [
            ("request_timeout_secs", self.scrape.request_timeout_secs),
            ("pipeline_timeout_secs", self.scrape.pipeline_timeout_secs),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(ClubConfigError::Invalid {
                    message: format!("scrape.{field} must be at least 1"),
                });
            }
        }
        self.field_extractor()
            .map_err(|e| ClubConfigError::Invalid {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

// ── Loading ──────────────────────────────────────────────────────────────

/// Parses and validates a club definition from TOML text.
///
/// # Errors
///
/// Returns [`ClubConfigError`] if the TOML is malformed or invalid.
pub fn parse_club_toml(toml_str: &str) -> Result<ClubDefinition, ClubConfigError> {
    let club: ClubDefinition = toml::de::from_str(toml_str)?;
    club.validate()?;
    Ok(club)
}

/// Returns the embedded default club definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (caught by the tests below).
#[must_use]
pub fn default_club() -> ClubDefinition {
    parse_club_toml(DEFAULT_CLUB_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded clubs/default.toml: {e}"))
}

/// Loads the club definition from `path`, falling back to the file named
/// by [`CONFIG_ENV_VAR`], then to the embedded default.
///
/// # Errors
///
/// Returns [`ClubConfigError`] if a named file cannot be read or parsed.
pub fn load_club(path: Option<&Path>) -> Result<ClubDefinition, ClubConfigError> {
    let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let Some(path) = path.map(Path::to_path_buf).or(from_env) else {
        log::debug!("Using embedded club definition");
        return Ok(default_club());
    };

    log::info!("Loading club definition from {}", path.display());
    let text = std::fs::read_to_string(&path).map_err(|source| ClubConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse_club_toml(&text)
}
