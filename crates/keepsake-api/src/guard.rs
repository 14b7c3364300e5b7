use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::session_claims;
use crate::AppState;

const STATIC_EXTENSIONS: &[&str] = &[
    ".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".ico", ".css", ".js",
];

/// Paths reachable without a session: the gallery itself, the whole API,
/// served media and static assets.
pub fn is_public_path(path: &str) -> bool {
    path == "/"
        || path.starts_with("/api/")
        || path.starts_with("/media/")
        || path.starts_with("/assets/")
        || STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Page-level session guard.
///
/// Anonymous visitors asking for /admin land on the gallery, logged-in
/// visitors asking for /login land on /admin, and any other non-public
/// path without a session falls back to the gallery.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let has_session = session_claims(&state.jwt_secret, &jar, req.headers()).is_some();

    if path.starts_with("/admin") && !has_session {
        debug!("Redirecting anonymous visitor away from {}", path);
        return Redirect::to("/").into_response();
    }
    if path.starts_with("/login") && has_session {
        return Redirect::to("/admin").into_response();
    }
    if !is_public_path(&path) && !has_session {
        debug!("Redirecting anonymous visitor away from {}", path);
        return Redirect::to("/").into_response();
    }

    next.run(req).await
}

/// Hard gate for the admin API. Valid session claims are stashed in request
/// extensions for handlers that want the caller's identity.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = session_claims(&state.jwt_secret, &jar, req.headers())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_api_and_media_are_public() {
        assert!(is_public_path("/"));
        assert!(is_public_path("/api/memories"));
        assert!(is_public_path("/media/a.jpg"));
        assert!(is_public_path("/assets/app.css"));
        assert!(is_public_path("/favicon.ico"));
    }

    #[test]
    fn admin_and_arbitrary_pages_are_not() {
        assert!(!is_public_path("/admin"));
        // The login modal lives on the gallery page; /login itself only
        // exists for the guard's redirect rules.
        assert!(!is_public_path("/login"));
        assert!(!is_public_path("/cupons"));
        assert!(!is_public_path("/raspadinha"));
    }
}
