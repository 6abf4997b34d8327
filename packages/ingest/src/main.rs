#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for publishing the club leaderboard snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use leaderboard_cli_utils::IndicatifProgress;
use leaderboard_ingest::{format_table, import_and_publish, read_paste_input, scrape_and_publish};
use leaderboard_ranking::RankOptions;
use leaderboard_scraper::fetch::HttpFetcher;
use leaderboard_snapshot::paths::snapshot_path;
use leaderboard_source::club::load_club;
use leaderboard_source::pipeline::{FailurePolicy, PipelineOptions};
use leaderboard_source::progress::ProgressCallback;

#[derive(Parser)]
#[command(name = "leaderboard_ingest", about = "Club leaderboard snapshot tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the club's squad and profile pages and publish the snapshot
    Scrape {
        /// Club definition TOML (overrides `LEADERBOARD_CONFIG`)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Snapshot file to write (overrides `SNAPSHOT_PATH`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave out players with fewer games than this
        #[arg(long, default_value = "0")]
        min_games: u32,
        /// Drop players whose profile page fails instead of aborting
        #[arg(long)]
        skip_failed: bool,
    },
    /// Publish the snapshot from pasted members JSON
    Import {
        /// File holding the members JSON (otherwise read from `EA_JSON`)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Snapshot file to write (overrides `SNAPSHOT_PATH`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave out players with fewer games than this
        #[arg(long, default_value = "0")]
        min_games: u32,
    },
    /// Print the published snapshot as a table
    Show {
        /// Snapshot file to read (overrides `SNAPSHOT_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = leaderboard_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            config,
            output,
            min_games,
            skip_failed,
        } => {
            let start = Instant::now();
            let club = load_club(config.as_deref())?;
            let fetcher =
                HttpFetcher::new(&club.scrape.user_agent, club.scrape.request_timeout())?;
            let policy = if skip_failed {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            };
            let options = PipelineOptions::for_club(&club, policy)
                .with_rank(RankOptions::with_min_games(min_games));
            let output = snapshot_path(output.as_deref());
            let progress: Arc<dyn ProgressCallback> =
                IndicatifProgress::for_club(&multi, &club.name);

            let snapshot =
                match scrape_and_publish(&club, &fetcher, &options, &progress, &output).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        log::error!(
                            "[{}] Nothing published after {:.1}s: {e}",
                            club.name,
                            start.elapsed().as_secs_f64()
                        );
                        return Err(e.into());
                    }
                };

            log::info!(
                "Published {} players to {} in {:.1}s",
                snapshot.rows.len(),
                output.display(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Import {
            file,
            output,
            min_games,
        } => {
            let raw = read_paste_input(file.as_deref())?;
            let output = snapshot_path(output.as_deref());
            let snapshot =
                import_and_publish(&raw, RankOptions::with_min_games(min_games), &output)?;
            log::info!(
                "Published {} pasted players to {}",
                snapshot.rows.len(),
                output.display()
            );
        }
        Commands::Show { path } => {
            let path = snapshot_path(path.as_deref());
            let snapshot = leaderboard_snapshot::read_snapshot(&path)?;
            print!("{}", format_table(&snapshot));
        }
    }

    Ok(())
}
