#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the club leaderboard.
//!
//! Serves the on-demand ranking at `/api/ga-per-match` (scraped live and
//! cached for ten minutes), the batch-published snapshot at `/stats.json`
//! and the frontend's static files. Everything except the login page, the
//! login endpoint, the health check and static assets sits behind the
//! shared-password gate in [`auth`].

pub mod auth;
pub mod cache;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use leaderboard_scraper::PageFetcher;
use leaderboard_scraper::fetch::HttpFetcher;
use leaderboard_snapshot::paths::snapshot_path;
use leaderboard_source::club::{ClubDefinition, load_club};

use crate::auth::SessionAuth;
use crate::cache::LeaderboardCache;

/// Environment variable naming the directory of frontend files.
pub const STATIC_DIR_ENV_VAR: &str = "STATIC_DIR";

/// Frontend directory used when [`STATIC_DIR_ENV_VAR`] is unset.
pub const DEFAULT_STATIC_DIR: &str = "app/dist";

/// Shared application state.
pub struct AppState {
    /// Club scraped by the on-demand endpoint.
    pub club: ClubDefinition,
    /// Upstream page source.
    pub fetcher: Arc<dyn PageFetcher>,
    /// Last on-demand result.
    pub cache: LeaderboardCache,
    /// Password gate.
    pub auth: SessionAuth,
    /// Batch-published snapshot served at `/stats.json`.
    pub snapshot_path: PathBuf,
    /// Frontend files.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Creates state with an empty cache.
    #[must_use]
    pub fn new(
        club: ClubDefinition,
        fetcher: Arc<dyn PageFetcher>,
        auth: SessionAuth,
        snapshot_path: PathBuf,
        static_dir: PathBuf,
    ) -> Self {
        Self {
            club,
            fetcher,
            cache: LeaderboardCache::default(),
            auth,
            snapshot_path,
            static_dir,
        }
    }
}

/// Registers the API and snapshot routes.
///
/// Static files are mounted separately by [`run_server`] since they must
/// come last.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/ga-per-match", web::get().to(handlers::ga_per_match))
            .route("/login", web::post().to(handlers::login)),
    )
    .route("/stats.json", web::get().to(handlers::stats_json))
    .route(auth::LOGIN_PATH, web::get().to(handlers::login_page));
}

/// Starts the leaderboard server.
///
/// Reads the club definition (`LEADERBOARD_CONFIG` or the embedded
/// default), `SITE_PASSWORD`, `SNAPSHOT_PATH`, `STATIC_DIR`, `BIND_ADDR`
/// and `PORT`. The caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an error if the club definition cannot be loaded, the HTTP
/// client cannot be built, or the server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let club = load_club(None).map_err(std::io::Error::other)?;
    let fetcher = HttpFetcher::new(&club.scrape.user_agent, club.scrape.request_timeout())
        .map_err(std::io::Error::other)?;

    let auth = SessionAuth::from_env();
    if !auth.is_configured() {
        log::warn!(
            "{} is not set; the site is open and logins are disabled",
            auth::PASSWORD_ENV_VAR
        );
    }

    let static_dir = std::env::var_os(STATIC_DIR_ENV_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);

    log::info!(
        "Serving {} ({}) from {}",
        club.name,
        club.club_id,
        club.source
    );

    let state = web::Data::new(AppState::new(
        club,
        Arc::new(fetcher),
        auth,
        snapshot_path(None),
        static_dir.clone(),
    ));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::from_fn(auth::require_session))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            .service(Files::new("/", &static_dir).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
