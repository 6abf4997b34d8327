//! Shared-password session gate.
//!
//! `POST /api/login` trades the site password for a session cookie. The
//! cookie value is a SHA-256 digest of the password, so changing
//! `SITE_PASSWORD` invalidates every existing session. [`require_session`]
//! redirects requests without a valid cookie to the login page.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse, web};
use sha2::{Digest as _, Sha256};

use crate::AppState;

/// Environment variable holding the site password.
pub const PASSWORD_ENV_VAR: &str = "SITE_PASSWORD";

/// Session cookie name.
pub const SESSION_COOKIE: &str = "auth";

/// Session lifetime in days.
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

const PUBLIC_PATHS: &[&str] = &[LOGIN_PATH, "/api/login", "/api/health", "/favicon.ico"];
const PUBLIC_PREFIXES: &[&str] = &["/assets/"];

/// Login failures. The display text is the client-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No site password is configured.
    #[error("SITE_PASSWORD not set")]
    NotConfigured,

    /// The submitted password does not match.
    #[error("Wrong password")]
    WrongPassword,
}

/// The configured site password and the session token derived from it.
#[derive(Debug, Clone, Default)]
pub struct SessionAuth {
    secret: Option<String>,
    token: Option<String>,
}

impl SessionAuth {
    /// Creates a gate for `secret`. `None` or an empty string disables
    /// logins and leaves the site open.
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        let token = secret.as_deref().map(session_token);
        Self { secret, token }
    }

    /// Reads the password from [`PASSWORD_ENV_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var(PASSWORD_ENV_VAR).ok())
    }

    /// Whether a site password is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// The cookie value a valid session carries.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Checks `password` and returns the session cookie to set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotConfigured`] if no password is configured and
    /// [`AuthError::WrongPassword`] on mismatch.
    pub fn login(&self, password: &str) -> Result<Cookie<'static>, AuthError> {
        let (Some(secret), Some(token)) = (self.secret.as_deref(), self.token.as_deref()) else {
            return Err(AuthError::NotConfigured);
        };
        if password != secret {
            return Err(AuthError::WrongPassword);
        }

        Ok(Cookie::build(SESSION_COOKIE, token.to_owned())
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(CookieDuration::days(SESSION_MAX_AGE_DAYS))
            .finish())
    }

    /// Whether `cookie_value` is a current session token.
    #[must_use]
    pub fn is_valid_session(&self, cookie_value: &str) -> bool {
        self.token.as_deref() == Some(cookie_value)
    }
}

fn session_token(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"club-leaderboard-session:");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `path` is reachable without a session.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Middleware redirecting requests without a valid session to
/// [`LOGIN_PATH`].
///
/// With no password configured every request passes.
///
/// # Errors
///
/// Propagates errors from the wrapped service.
pub async fn require_session<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let allowed = is_public_path(req.path())
        || req
            .app_data::<web::Data<AppState>>()
            .is_some_and(|state| {
                !state.auth.is_configured()
                    || req
                        .cookie(SESSION_COOKIE)
                        .is_some_and(|c| state.auth.is_valid_session(c.value()))
            });

    if allowed {
        return next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body);
    }

    log::debug!("No session for {}, redirecting to {LOGIN_PATH}", req.path());
    let response = HttpResponse::Found()
        .insert_header((header::LOCATION, LOGIN_PATH))
        .finish();
    Ok(req.into_response(response).map_into_right_body())
}
