//! Scrape pipeline: squad page → profile links → profiles → ranked snapshot.
//!
//! The squad page is fetched first; without a roster there is nothing to
//! rank, so any failure there aborts the run. Profile pages are then
//! fetched concurrently, at most `concurrency` at a time, and collected
//! back into roster order before ranking. What happens when a single
//! profile fails is up to the caller ([`FailurePolicy`]).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt as _};
use leaderboard_ranking::{RankOptions, rank};
use leaderboard_scraper::profile::extract_player_totals;
use leaderboard_scraper::roster::extract_roster_links;
use leaderboard_scraper::{PageFetcher, ScrapeError};
use leaderboard_stats_models::{PlayerRecord, Snapshot};

use crate::club::{ClubConfigError, ClubDefinition};
use crate::progress::ProgressCallback;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A fetch failed: the squad page, or a profile under
    /// [`FailurePolicy::Abort`].
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// The club definition cannot drive a run.
    #[error(transparent)]
    Config(#[from] ClubConfigError),

    /// The whole run exceeded its time budget.
    #[error("pipeline timed out after {0:?}")]
    Timeout(Duration),
}

/// What to do when a single profile page cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the player and carry on.
    Skip,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum profile fetches in flight.
    pub concurrency: usize,
    /// Budget for the whole run.
    pub timeout: Duration,
    /// Profile failure handling.
    pub on_player_failure: FailurePolicy,
    /// Ranking options.
    pub rank: RankOptions,
}

impl PipelineOptions {
    /// Options taken from the club's scrape settings.
    #[must_use]
    pub const fn for_club(club: &ClubDefinition, on_player_failure: FailurePolicy) -> Self {
        Self {
            concurrency: club.scrape.concurrency,
            timeout: club.scrape.pipeline_timeout(),
            on_player_failure,
            rank: RankOptions { min_games: 0 },
        }
    }

    /// Sets the ranking options.
    #[must_use]
    pub const fn with_rank(mut self, rank: RankOptions) -> Self {
        self.rank = rank;
        self
    }
}

/// Unranked result of scraping the roster.
#[derive(Debug, Clone, Default)]
pub struct RosterScrape {
    /// One record per fetched profile, in roster order.
    pub records: Vec<PlayerRecord>,
    /// Profile URLs dropped under [`FailurePolicy::Skip`].
    pub skipped: Vec<String>,
}

/// Fetches the squad page and every linked profile.
///
/// # Errors
///
/// Returns [`PipelineError::Scrape`] if the squad page fails, or if any
/// profile fails under [`FailurePolicy::Abort`] (the first failure in
/// roster order is reported).
pub async fn scrape_roster(
    club: &ClubDefinition,
    fetcher: &dyn PageFetcher,
    options: &PipelineOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RosterScrape, PipelineError> {
    let base = club.base()?;
    let extractor = club.field_extractor()?;
    let squad_url = club.squad_url();

    log::info!("[{}] Fetching squad page {squad_url}", club.name);
    progress.squad_started(&club.name);
    let squad_html = fetcher.fetch(&squad_url).await?;

    let urls: Vec<String> = extract_roster_links(&squad_html, &club.roster_pattern(), &base)
        .into_iter()
        .collect();

    if urls.is_empty() {
        log::warn!(
            "[{}] No profile links matching '{}' on the squad page",
            club.name,
            club.roster_pattern().profile_fragment()
        );
    } else {
        log::info!(
            "[{}] Found {} profiles, fetching (concurrency={})",
            club.name,
            urls.len(),
            options.concurrency
        );
    }

    progress.roster_found(urls.len() as u64);

    let extractor = &extractor;
    let mut results: Vec<(usize, Result<PlayerRecord, ScrapeError>)> =
        stream::iter(urls.iter().enumerate().map(|(idx, url)| async move {
            let result = fetcher
                .fetch(url)
                .await
                .map(|html| extract_player_totals(&html, url, extractor));
            progress.profile_done(url, result.is_ok());
            (idx, result)
        }))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    results.sort_unstable_by_key(|(idx, _)| *idx);

    let mut scrape = RosterScrape::default();
    for (idx, result) in results {
        match result {
            Ok(record) => scrape.records.push(record),
            Err(e) => match options.on_player_failure {
                FailurePolicy::Abort => {
                    log::error!("[{}] Profile fetch failed: {e}", club.name);
                    return Err(e.into());
                }
                FailurePolicy::Skip => {
                    log::warn!("[{}] Dropping player: {e}", club.name);
                    scrape.skipped.push(urls[idx].clone());
                }
            },
        }
    }

    Ok(scrape)
}

/// Runs the full pipeline and returns a ranked snapshot.
///
/// # Errors
///
/// Returns [`PipelineError::Timeout`] if the run exceeds
/// `options.timeout`, otherwise whatever [`scrape_roster`] returns. Either
/// way the failure is reported to `progress`.
pub async fn build_snapshot(
    club: &ClubDefinition,
    fetcher: &dyn PageFetcher,
    options: &PipelineOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Snapshot, PipelineError> {
    let result = tokio::time::timeout(
        options.timeout,
        scrape_roster(club, fetcher, options, progress),
    )
    .await
    .map_err(|_| PipelineError::Timeout(options.timeout))
    .and_then(|scrape| scrape);

    let scrape = match result {
        Ok(scrape) => scrape,
        Err(e) => {
            progress.failed(&e.to_string());
            return Err(e);
        }
    };

    let fetched = scrape.records.len();
    let rows = rank(scrape.records, options.rank);
    let snapshot = Snapshot::new(Utc::now(), rows);

    let degraded = snapshot.degraded_count();
    if degraded > 0 {
        log::warn!(
            "[{}] {degraded} of {fetched} players have defaulted stats",
            club.name
        );
    }
    progress.completed(snapshot.rows.len(), scrape.skipped.len());

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use leaderboard_scraper::fetch::MemoryFetcher;

    use super::*;
    use crate::club::default_club;
    use crate::progress::null_progress;

    const SQUAD: &str = "https://proclubshead.com/26/club-squad/gen5-420295/";
    const ALPHA: &str = "https://proclubshead.com/26/club-player/gen5-420295-Alpha/";
    const BRAVO: &str = "https://proclubshead.com/26/club-player/gen5-420295-Bravo/";

    fn squad_page() -> String {
        format!(
            r#"<a href="/26/club-player/gen5-420295-Bravo/">B</a>
               <a href="{ALPHA}">A</a>
               <a href="/26/club-player/gen5-111-Other/">O</a>"#
        )
    }

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_page(SQUAD, &squad_page())
            .with_page(
                ALPHA,
                "<h1>Alpha</h1><p>Matches played 10</p><p>Goals 4</p><p>Assists 6</p>",
            )
            .with_page(
                BRAVO,
                "<h1>Bravo</h1><p>Matches played 0</p><p>Goals 0</p><p>Assists 0</p>",
            )
    }

    fn options(policy: FailurePolicy) -> PipelineOptions {
        PipelineOptions::for_club(&default_club(), policy)
    }

    #[tokio::test]
    async fn ranks_scraped_players() {
        let snapshot = build_snapshot(
            &default_club(),
            &fetcher(),
            &options(FailurePolicy::Abort),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(snapshot.rows.len(), 2);
        let first = &snapshot.rows[0];
        assert_eq!(first.name(), "Alpha");
        assert_eq!(first.combined(), 10);
        assert!((first.rate_per_match() - 1.0).abs() < f64::EPSILON);
        let second = &snapshot.rows[1];
        assert_eq!(second.name(), "Bravo");
        assert_eq!(second.combined(), 0);
        assert!(second.rate_per_match().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn squad_failure_aborts() {
        let fetcher = MemoryFetcher::new().with_status(SQUAD, 500);
        let result = build_snapshot(
            &default_club(),
            &fetcher,
            &options(FailurePolicy::Skip),
            &null_progress(),
        )
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::Scrape(ScrapeError::UpstreamUnavailable {
                status: 500,
                ..
            }))
        ));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn profile_failure_aborts_under_abort_policy() {
        let fetcher = fetcher().with_status(BRAVO, 503);
        let result = scrape_roster(
            &default_club(),
            &fetcher,
            &options(FailurePolicy::Abort),
            &null_progress(),
        )
        .await;

        match result {
            Err(PipelineError::Scrape(e)) => assert_eq!(e.url(), Some(BRAVO)),
            other => panic!("expected a scrape error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn profile_failure_drops_player_under_skip_policy() {
        let fetcher = fetcher().with_status(BRAVO, 503);
        let scrape = scrape_roster(
            &default_club(),
            &fetcher,
            &options(FailurePolicy::Skip),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(scrape.records.len(), 1);
        assert_eq!(scrape.records[0].name(), "Alpha");
        assert_eq!(scrape.skipped, vec![BRAVO.to_string()]);
    }

    #[tokio::test]
    async fn records_come_back_in_roster_order() {
        let mut opts = options(FailurePolicy::Abort);
        opts.concurrency = 1;
        let scrape = scrape_roster(&default_club(), &fetcher(), &opts, &null_progress())
            .await
            .unwrap();
        let origins: Vec<&str> = scrape.records.iter().map(PlayerRecord::origin).collect();
        assert_eq!(origins, vec![ALPHA, BRAVO]);
    }

    #[tokio::test]
    async fn min_games_applies_to_snapshot() {
        let opts = options(FailurePolicy::Abort).with_rank(RankOptions::with_min_games(1));
        let snapshot = build_snapshot(&default_club(), &fetcher(), &opts, &null_progress())
            .await
            .unwrap();
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].name(), "Alpha");
    }

    #[tokio::test]
    async fn empty_roster_yields_empty_snapshot() {
        let fetcher = MemoryFetcher::new().with_page(SQUAD, "<p>No players</p>");
        let snapshot = build_snapshot(
            &default_club(),
            &fetcher,
            &options(FailurePolicy::Abort),
            &null_progress(),
        )
        .await
        .unwrap();
        assert!(snapshot.rows.is_empty());
    }

    /// Serves pages from a [`MemoryFetcher`] after a delay, tracking how
    /// many fetches overlap.
    struct SlowFetcher {
        pages: MemoryFetcher,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowFetcher {
        fn new(pages: MemoryFetcher, delay: Duration) -> Self {
            Self {
                pages,
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pages.fetch(url).await
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ProgressCallback for RecordingProgress {
        fn squad_started(&self, club: &str) {
            self.push(format!("squad {club}"));
        }
        fn roster_found(&self, profiles: u64) {
            self.push(format!("roster {profiles}"));
        }
        fn profile_done(&self, _url: &str, ok: bool) {
            self.push(format!("profile {ok}"));
        }
        fn completed(&self, ranked: usize, skipped: usize) {
            self.push(format!("completed {ranked} {skipped}"));
        }
        fn failed(&self, reason: &str) {
            self.push(format!("failed {reason}"));
        }
    }

    fn large_squad(players: usize) -> MemoryFetcher {
        let links: String = (0..players)
            .map(|i| format!(r#"<a href="/26/club-player/gen5-420295-P{i}/">P{i}</a>"#))
            .collect();
        (0..players).fold(MemoryFetcher::new().with_page(SQUAD, &links), |f, i| {
            f.with_page(
                &format!("https://proclubshead.com/26/club-player/gen5-420295-P{i}/"),
                &format!(
                    "<h1>P{i}</h1><p>Matches played {i}</p><p>Goals 1</p><p>Assists 0</p>"
                ),
            )
        })
    }

    #[tokio::test]
    async fn profile_fetches_never_exceed_concurrency() {
        let fetcher = SlowFetcher::new(large_squad(9), Duration::from_millis(20));
        let mut opts = options(FailurePolicy::Abort);
        opts.concurrency = 3;

        let scrape = scrape_roster(&default_club(), &fetcher, &opts, &null_progress())
            .await
            .unwrap();

        assert_eq!(scrape.records.len(), 9);
        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight fetches was {peak}");
        assert!(peak > 1, "profile fetches never overlapped");
    }

    #[tokio::test]
    async fn slow_run_times_out() {
        let fetcher = SlowFetcher::new(fetcher(), Duration::from_millis(200));
        let mut opts = options(FailurePolicy::Abort);
        opts.timeout = Duration::from_millis(50);
        let progress = Arc::new(RecordingProgress::default());
        let callback: Arc<dyn ProgressCallback> = progress.clone();

        let result = build_snapshot(&default_club(), &fetcher, &opts, &callback).await;

        match result {
            Err(PipelineError::Timeout(budget)) => {
                assert_eq!(budget, Duration::from_millis(50));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        let events = progress.events.lock().unwrap();
        assert_eq!(
            events.last().map(String::as_str),
            Some("failed pipeline timed out after 50ms")
        );
    }

    #[tokio::test]
    async fn progress_follows_run_stages() {
        let progress = Arc::new(RecordingProgress::default());
        let callback: Arc<dyn ProgressCallback> = progress.clone();
        let mut opts = options(FailurePolicy::Skip);
        opts.concurrency = 1;

        build_snapshot(
            &default_club(),
            &fetcher().with_status(BRAVO, 503),
            &opts,
            &callback,
        )
        .await
        .unwrap();

        let club = default_club();
        assert_eq!(
            *progress.events.lock().unwrap(),
            vec![
                format!("squad {}", club.name),
                "roster 2".to_string(),
                "profile true".to_string(),
                "profile false".to_string(),
                "completed 1 1".to_string(),
            ]
        );
    }
}
