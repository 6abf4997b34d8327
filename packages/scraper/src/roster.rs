//! Squad page link collection.

use std::collections::BTreeSet;

use reqwest::Url;
use scraper::{Html, Selector};

/// Identifies which profile links on a squad page belong to the club.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPattern {
    /// Season path segment (e.g. `"26"`).
    pub season: String,
    /// Platform generation prefix (e.g. `"gen5"`).
    pub generation: String,
    /// Upstream club identifier (e.g. `"420295"`).
    pub club_id: String,
}

impl RosterPattern {
    /// The path fragment every same-club profile link contains:
    /// `/<season>/club-player/<generation>-<club_id>-`.
    #[must_use]
    pub fn profile_fragment(&self) -> String {
        format!(
            "/{}/club-player/{}-{}-",
            self.season, self.generation, self.club_id
        )
    }
}

/// Collects every same-club profile URL linked from a squad page.
///
/// Relative links are resolved against `base`. Duplicates collapse; the
/// returned set is ordered by URL so downstream work is deterministic.
#[must_use]
pub fn extract_roster_links(markup: &str, pattern: &RosterPattern, base: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(markup);
    let anchor_sel = Selector::parse("a[href]").unwrap_or_else(|_| unreachable!());
    let fragment = pattern.profile_fragment();

    let mut links = BTreeSet::new();
    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(&fragment) {
            continue;
        }
        match base.join(href.trim()) {
            Ok(url) => {
                links.insert(url.to_string());
            }
            Err(e) => log::debug!("skipping unresolvable profile link '{href}': {e}"),
        }
    }

    links
}
