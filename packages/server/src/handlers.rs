//! HTTP handler functions for the leaderboard API.

use std::time::Instant;

use actix_files::NamedFile;
use actix_web::http::header::{CACHE_CONTROL, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};
use leaderboard_ranking::filter_min_games;
use leaderboard_server_models::{
    ApiError, ApiHealth, ApiLeaderboard, ApiOk, LeaderboardQueryParams, LoginRequest,
};
use leaderboard_source::pipeline::{FailurePolicy, PipelineOptions, build_snapshot};
use leaderboard_source::progress::null_progress;

use crate::AppState;
use crate::auth::AuthError;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/ga-per-match?minGames=<n>`
///
/// Ranks the club on demand. The full ranking is cached for ten minutes
/// and filtered per request. A failing squad page yields 502; players
/// whose profile fails are left out.
pub async fn ga_per_match(
    state: web::Data<AppState>,
    params: web::Query<LeaderboardQueryParams>,
) -> HttpResponse {
    let min_games = match parse_min_games(params.min_games.as_deref()) {
        Ok(v) => v,
        Err(message) => return HttpResponse::BadRequest().json(ApiError::new(message)),
    };

    let club = &state.club;
    let fetcher = state.fetcher.as_ref();
    let options = PipelineOptions::for_club(club, FailurePolicy::Skip);
    let options = &options;
    let lookup = state
        .cache
        .get_or_refresh(Instant::now(), move || async move {
            log::info!("Refreshing on-demand leaderboard for {}", club.name);
            let progress = null_progress();
            build_snapshot(club, fetcher, options, &progress).await
        })
        .await;

    match lookup {
        Ok(lookup) => {
            let snapshot = &lookup.snapshot;
            HttpResponse::Ok().json(ApiLeaderboard {
                club_id: state.club.club_id.clone(),
                source: state.club.source.clone(),
                generated_at: snapshot.generated_at,
                min_games,
                cached: lookup.cached,
                rows: filter_min_games(snapshot.rows.clone(), min_games),
            })
        }
        Err(e) => {
            log::error!("On-demand leaderboard failed: {e}");
            HttpResponse::BadGateway().json(ApiError::new(e.to_string()))
        }
    }
}

/// `POST /api/login`
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> HttpResponse {
    match state.auth.login(&body.password) {
        Ok(cookie) => HttpResponse::Ok().cookie(cookie).json(ApiOk { ok: true }),
        Err(e @ AuthError::NotConfigured) => {
            log::error!("Login attempted but {e}");
            HttpResponse::InternalServerError().json(ApiError::new(e.to_string()))
        }
        Err(e @ AuthError::WrongPassword) => {
            log::warn!("Rejected login: {e}");
            HttpResponse::Unauthorized().json(ApiError::new(e.to_string()))
        }
    }
}

/// `GET /stats.json`
///
/// Serves the last published snapshot file, never cached by the client.
pub async fn stats_json(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match NamedFile::open_async(&state.snapshot_path).await {
        Ok(file) => {
            let mut response = file
                .use_etag(false)
                .use_last_modified(false)
                .into_response(&req);
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        Err(e) => {
            log::warn!(
                "Snapshot {} unavailable: {e}",
                state.snapshot_path.display()
            );
            HttpResponse::NotFound().json(ApiError::new("No snapshot has been published yet"))
        }
    }
}

/// `GET /login`
pub async fn login_page(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let path = state.static_dir.join("login.html");
    match NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            log::error!("Login page {} missing: {e}", path.display());
            HttpResponse::NotFound().finish()
        }
    }
}

/// Parses the `minGames` query value. Missing or blank means no threshold.
fn parse_min_games(raw: Option<&str>) -> Result<u32, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| format!("minGames must be a non-negative integer, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_games_defaults_to_zero() {
        assert_eq!(parse_min_games(None), Ok(0));
        assert_eq!(parse_min_games(Some(" ")), Ok(0));
    }

    #[test]
    fn min_games_parses_integers() {
        assert_eq!(parse_min_games(Some("3")), Ok(3));
        assert_eq!(parse_min_games(Some(" 10 ")), Ok(10));
    }

    #[test]
    fn min_games_rejects_garbage() {
        assert!(parse_min_games(Some("abc")).is_err());
        assert!(parse_min_games(Some("-1")).is_err());
        assert!(parse_min_games(Some("2.5")).is_err());
    }
}
