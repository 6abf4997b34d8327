#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Page fetching and stat extraction for the club leaderboard.
//!
//! Provides the [`PageFetcher`] trait with an HTTP implementation
//! ([`fetch::HttpFetcher`]) and an in-memory one ([`fetch::MemoryFetcher`]),
//! plus the two extractors the pipeline runs over fetched markup:
//! roster link collection ([`roster`]) and per-player totals ([`profile`]).
//!
//! Extraction never fails on malformed markup. Missing values come back as
//! `None` and are flagged as defaulted by the caller.

pub mod fetch;
pub mod profile;
pub mod roster;

use async_trait::async_trait;

/// Errors that can occur while fetching upstream pages.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The upstream server answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamUnavailable {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response (timeout, DNS, reset).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),

    /// A label rule produced an invalid search pattern.
    #[error("invalid label pattern for '{label}': {message}")]
    Pattern {
        /// Label text the rule was built from.
        label: String,
        /// Regex compiler message.
        message: String,
    },
}

impl ScrapeError {
    /// Returns the URL a fetch error refers to, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::UpstreamUnavailable { url, .. } | Self::Network { url, .. } => Some(url),
            Self::Client(_) | Self::Pattern { .. } => None,
        }
    }
}

/// Fetches a page of markup by URL.
///
/// Implementations perform no retries. Retry policy, if any, belongs to
/// the caller.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::UpstreamUnavailable`] for a non-2xx response
    /// and [`ScrapeError::Network`] when no response was received.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}
