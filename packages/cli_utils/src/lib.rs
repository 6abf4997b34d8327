#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing shared by the leaderboard binaries.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so log lines and the profile progress bar do not
//! tear each other up. [`IndicatifProgress`] is the bar itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use leaderboard_source::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Shows a pipeline run for one club as an `indicatif` bar.
///
/// Spins while the squad page loads, then counts profile pages with
/// percentage and ETA. Failed profiles are tallied in the message.
pub struct IndicatifProgress {
    bar: ProgressBar,
    club: String,
    failed_profiles: AtomicU64,
}

impl IndicatifProgress {
    /// Adds a bar for `club` to `multi`.
    #[must_use]
    pub fn for_club(multi: &MultiProgress, club: &str) -> Arc<Self> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        Arc::new(Self {
            bar,
            club: club.to_string(),
            failed_profiles: AtomicU64::new(0),
        })
    }

    fn profiles_style() -> ProgressStyle {
        ProgressStyle::with_template("  {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

impl ProgressCallback for IndicatifProgress {
    fn squad_started(&self, club: &str) {
        self.bar.set_message(format!("[{club}] squad page"));
    }

    fn roster_found(&self, profiles: u64) {
        self.bar.set_length(profiles);
        self.bar.set_position(0);
        self.bar.set_style(Self::profiles_style());
        self.bar.set_message(format!("[{}] profiles", self.club));
    }

    fn profile_done(&self, url: &str, ok: bool) {
        if !ok {
            let failed = self.failed_profiles.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("Profile failed: {url}");
            self.bar
                .set_message(format!("[{}] profiles ({failed} failed)", self.club));
        }
        self.bar.inc(1);
    }

    fn completed(&self, ranked: usize, skipped: usize) {
        self.bar.finish_with_message(format!(
            "[{}] {ranked} players ranked, {skipped} skipped",
            self.club
        ));
    }

    fn failed(&self, reason: &str) {
        self.bar
            .abandon_with_message(format!("[{}] aborted: {reason}", self.club));
    }
}

/// Installs the global logger, wrapped so that output is suspended while
/// progress bars redraw.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when several tests share a process.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
