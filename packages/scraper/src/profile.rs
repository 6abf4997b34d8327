//! Player profile extraction.
//!
//! A profile page is reduced to a display name (the first `<h1>`) and one
//! whitespace-collapsed string of visible text. Each stat is then located
//! by a [`LabelRule`]: the label text, matched case-insensitively, followed
//! within `window` characters by the first numeral.
//!
//! # Known limitation
//!
//! The search takes the leftmost label occurrence that has a numeral inside
//! its window, and the first numeral after it. That is a structural bet on
//! the upstream page layout: if the label also appears earlier in unrelated
//! prose that happens to contain a number, the wrong value is read. Such
//! values cannot be detected here; only values that are missing or not a
//! whole number are reported (as `None`).

use leaderboard_stats_models::{PlayerRecord, PlayerTotals, UNKNOWN_PLAYER_NAME};
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::ScrapeError;

/// Default number of characters allowed between a label and its value.
pub const DEFAULT_LABEL_WINDOW: usize = 120;

/// Upper bound for a configured label window.
pub const MAX_LABEL_WINDOW: usize = 2_000;

/// Elements whose text never counts as visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Which count a [`LabelRule`] fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    /// Matches played.
    Games,
    /// Goals scored.
    Goals,
    /// Assists.
    Assists,
}

/// Locates one stat by its label in flattened page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRule {
    /// Count this rule fills in.
    pub field: StatField,
    /// Label text as it appears on the page.
    pub label: String,
    /// Maximum characters between the label and the numeral.
    pub window: usize,
}

impl LabelRule {
    /// Creates a rule with the default window.
    #[must_use]
    pub fn new(field: StatField, label: &str) -> Self {
        Self {
            field,
            label: label.to_owned(),
            window: DEFAULT_LABEL_WINDOW,
        }
    }

    /// The rules for the standard profile layout.
    #[must_use]
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new(StatField::Games, "Matches played"),
            Self::new(StatField::Goals, "Goals"),
            Self::new(StatField::Assists, "Assists"),
        ]
    }
}

/// An ordered set of compiled [`LabelRule`]s.
///
/// Several rules may target the same field; the first one that yields a
/// value wins, which lets a layout list fallback labels.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<(LabelRule, Regex)>,
}

impl FieldExtractor {
    /// Compiles the given rules.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Pattern`] if a label is empty, its window
    /// exceeds [`MAX_LABEL_WINDOW`], or the pattern fails to compile.
    pub fn new(rules: &[LabelRule]) -> Result<Self, ScrapeError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let label = rule.label.trim();
                if label.is_empty() {
                    return Err(ScrapeError::Pattern {
                        label: rule.label.clone(),
                        message: "label is empty".to_string(),
                    });
                }
                if rule.window > MAX_LABEL_WINDOW {
                    return Err(ScrapeError::Pattern {
                        label: rule.label.clone(),
                        message: format!(
                            "window {} exceeds the maximum of {MAX_LABEL_WINDOW}",
                            rule.window
                        ),
                    });
                }
                let pattern = format!(
                    r"(?i){}(?s:.){{0,{}}}?([0-9]+(?:\.[0-9]+)?)",
                    regex::escape(label),
                    rule.window
                );
                let re = Regex::new(&pattern).map_err(|e| ScrapeError::Pattern {
                    label: rule.label.clone(),
                    message: e.to_string(),
                })?;
                Ok((rule.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules: compiled })
    }

    /// An extractor for the standard profile layout.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(&LabelRule::standard()).unwrap_or_else(|_| unreachable!())
    }

    /// Looks up a single field in flattened text.
    #[must_use]
    pub fn find(&self, field: StatField, text: &str) -> Option<u32> {
        for (rule, re) in self.rules.iter().filter(|(r, _)| r.field == field) {
            let Some(caps) = re.captures(text) else {
                log::debug!("label '{}' not found", rule.label);
                continue;
            };
            let numeral = &caps[1];
            if let Some(value) = parse_count(numeral) {
                return Some(value);
            }
            log::debug!(
                "label '{}' followed by '{numeral}', which is not a count",
                rule.label
            );
        }
        None
    }

    /// Extracts all three counts from flattened text.
    #[must_use]
    pub fn extract(&self, text: &str) -> PlayerTotals {
        PlayerTotals {
            games: self.find(StatField::Games, text),
            goals: self.find(StatField::Goals, text),
            assists: self.find(StatField::Assists, text),
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parses a numeral as a non-negative whole count.
///
/// `"12"` and `"12.0"` are counts; `"12.5"` and values past `u32::MAX`
/// are not.
fn parse_count(numeral: &str) -> Option<u32> {
    let (whole, fraction) = numeral.split_once('.').unwrap_or((numeral, ""));
    if fraction.bytes().any(|b| b != b'0') {
        return None;
    }
    whole.parse().ok()
}

/// Flattens the visible text of a document into one string, with runs of
/// whitespace collapsed to single spaces and text nodes separated by a
/// space.
#[must_use]
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }

    out
}

/// Text of the first `<h1>`, whitespace-collapsed. `None` if absent or blank.
#[must_use]
pub fn heading_name(document: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").unwrap_or_else(|_| unreachable!());
    let heading = document.select(&h1_sel).next()?;
    let name = heading
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

/// Derives a name from the last path segment of a profile URL.
///
/// Profile segments look like `gen5-420295-PlayerName`; the
/// `<generation>-<club>-` prefix is dropped when present.
#[must_use]
pub fn name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rfind(|s| !s.is_empty())?;
    let slug = segment.splitn(3, '-').nth(2).unwrap_or(segment).trim();
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Builds a [`PlayerRecord`] from a profile page.
///
/// Never fails: a missing name falls back to [`name_from_url`] and then to
/// `"Unknown"`, and missing counts default to zero with their provenance
/// flagged.
#[must_use]
pub fn extract_player_totals(
    markup: &str,
    profile_url: &str,
    extractor: &FieldExtractor,
) -> PlayerRecord {
    let document = Html::parse_document(markup);

    let name = heading_name(&document)
        .or_else(|| name_from_url(profile_url))
        .unwrap_or_else(|| UNKNOWN_PLAYER_NAME.to_string());

    let text = visible_text(&document);
    let totals = extractor.extract(&text);

    let record = PlayerRecord::from_totals(name, totals, profile_url);
    let provenance = record.provenance();
    if provenance.is_degraded() {
        log::debug!(
            "{profile_url}: games {}, goals {}, assists {}",
            provenance.games,
            provenance.goals,
            provenance.assists
        );
    }
    record
}

#[cfg(test)]
mod tests {
    use leaderboard_stats_models::FieldSource;

    use super::*;

    const PROFILE_URL: &str = "https://proclubshead.com/26/club-player/gen5-420295-Alpha/";

    const PROFILE: &str = r#"
        <html>
          <head><title>Alpha | Pro Clubs</title></head>
          <body>
            <h1>  Alpha
                  Striker </h1>
            <script>var stats = { "Goals": 999 };</script>
            <table>
              <tr><th>Matches played</th><td>10</td></tr>
              <tr><th>Goals</th><td><span>4</span></td></tr>
              <tr><th>Assists</th><td>6</td></tr>
            </table>
          </body>
        </html>
    "#;

    #[test]
    fn extracts_name_and_counts() {
        let record = extract_player_totals(PROFILE, PROFILE_URL, &FieldExtractor::standard());
        assert_eq!(record.name(), "Alpha Striker");
        assert_eq!(record.games(), 10);
        assert_eq!(record.goals(), 4);
        assert_eq!(record.assists(), 6);
        assert_eq!(record.combined(), 10);
        assert_eq!(record.origin(), PROFILE_URL);
        assert!(!record.provenance().is_degraded());
    }

    #[test]
    fn extraction_is_idempotent() {
        let extractor = FieldExtractor::standard();
        let first = extract_player_totals(PROFILE, PROFILE_URL, &extractor);
        let second = extract_player_totals(PROFILE, PROFILE_URL, &extractor);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_labels_default_to_zero() {
        let html = "<h1>Ghost</h1><p>Matches played 3</p>";
        let record = extract_player_totals(html, PROFILE_URL, &FieldExtractor::standard());
        assert_eq!(record.games(), 3);
        assert_eq!(record.goals(), 0);
        assert_eq!(record.assists(), 0);
        assert_eq!(record.provenance().games, FieldSource::Extracted);
        assert_eq!(record.provenance().goals, FieldSource::Defaulted);
        assert_eq!(record.provenance().assists, FieldSource::Defaulted);
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let extractor = FieldExtractor::standard();
        assert_eq!(extractor.find(StatField::Goals, "GOALS: 12"), Some(12));
    }

    #[test]
    fn numeral_outside_window_is_ignored() {
        let filler = "x".repeat(DEFAULT_LABEL_WINDOW + 1);
        let text = format!("Assists {filler} 7");
        let extractor = FieldExtractor::standard();
        assert_eq!(extractor.find(StatField::Assists, &text), None);

        let near = format!("Assists {} 7", "x".repeat(DEFAULT_LABEL_WINDOW - 2));
        assert_eq!(extractor.find(StatField::Assists, &near), Some(7));
    }

    #[test]
    fn takes_first_numeral_after_label() {
        let extractor = FieldExtractor::standard();
        assert_eq!(
            extractor.find(StatField::Goals, "Goals this season 5 of 20 shots"),
            Some(5)
        );
    }

    #[test]
    fn only_ascii_digits_count_as_numerals() {
        let extractor = FieldExtractor::standard();
        assert_eq!(
            extractor.find(StatField::Goals, "Goals (\u{662}\u{660}\u{662}\u{665}) 7"),
            Some(7)
        );
        assert_eq!(extractor.find(StatField::Assists, "Assists \u{967}\u{968}"), None);
    }

    #[test]
    fn fractional_values_are_not_counts() {
        let extractor = FieldExtractor::standard();
        assert_eq!(extractor.find(StatField::Goals, "Goals 2.0"), Some(2));
        assert_eq!(extractor.find(StatField::Goals, "Goals 2.5"), None);
    }

    #[test]
    fn fallback_rule_applies_when_primary_label_is_missing() {
        let mut rules = LabelRule::standard();
        rules.push(LabelRule::new(StatField::Games, "Appearances"));
        let extractor = FieldExtractor::new(&rules).unwrap();
        assert_eq!(extractor.find(StatField::Games, "Appearances 14"), Some(14));
        assert_eq!(
            extractor.find(StatField::Games, "Matches played 9 Appearances 14"),
            Some(9)
        );
    }

    #[test]
    fn rejects_empty_label_and_oversized_window() {
        assert!(FieldExtractor::new(&[LabelRule::new(StatField::Goals, "  ")]).is_err());

        let mut rule = LabelRule::new(StatField::Goals, "Goals");
        rule.window = MAX_LABEL_WINDOW + 1;
        assert!(FieldExtractor::new(&[rule]).is_err());
    }

    #[test]
    fn label_text_is_matched_literally() {
        let extractor =
            FieldExtractor::new(&[LabelRule::new(StatField::Goals, "G+A (total)")]).unwrap();
        assert_eq!(extractor.find(StatField::Goals, "G+A (total) 8"), Some(8));
        assert_eq!(extractor.find(StatField::Goals, "GGA total 8"), None);
    }

    #[test]
    fn name_falls_back_to_url_slug() {
        let html = "<h1>   </h1><p>Goals 1</p>";
        let record = extract_player_totals(html, PROFILE_URL, &FieldExtractor::standard());
        assert_eq!(record.name(), "Alpha");
    }

    #[test]
    fn name_falls_back_to_unknown() {
        let record = extract_player_totals("<p>nothing</p>", "not a url", &FieldExtractor::standard());
        assert_eq!(record.name(), UNKNOWN_PLAYER_NAME);
        assert_eq!(record.games(), 0);
    }

    #[test]
    fn visible_text_skips_scripts_and_separates_cells() {
        let document = Html::parse_document(
            "<table><tr><td>10</td><td>4</td></tr></table><style>.a{}</style>",
        );
        assert_eq!(visible_text(&document), "10 4");
    }

    #[test]
    fn slug_without_prefix_is_used_whole() {
        assert_eq!(
            name_from_url("https://example.com/players/Solo/"),
            Some("Solo".to_string())
        );
        assert_eq!(name_from_url("https://example.com/"), None);
    }
}
