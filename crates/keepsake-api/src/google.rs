use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::Json;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::AppState;

pub const ACCESS_COOKIE: &str = "google_access_token";
pub const REFRESH_COOKIE: &str = "google_refresh_token";

const ACCESS_MAX_AGE_SECS: i64 = 60 * 60;
const REFRESH_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

const CONSENT_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DRIVE_SCOPE: &str = "https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdrive.readonly";

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

// Escape everything RFC 6265 keeps out of a cookie-octet, plus '%' so the
// encoding stays unambiguous.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

fn cookie_header(name: &str, value: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        utf8_percent_encode(value, COOKIE_VALUE),
        max_age
    )
}

/// Kick off the consent flow. Without credentials configured the integration
/// reports itself unavailable instead of sending the browser nowhere.
pub async fn start(State(state): State<AppState>) -> impl IntoResponse {
    let Some(config) = &state.google else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "google integration not configured" })),
        )
            .into_response();
    };

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        CONSENT_URL, config.client_id, config.redirect_url, DRIVE_SCOPE
    );
    Redirect::to(&url).into_response()
}

/// Exchange the consent code for tokens and drop them in cookies; the access
/// token lives an hour, the refresh token a month.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let Some(config) = &state.google else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "google integration not configured" })),
        )
            .into_response();
    };
    if let Some(e) = params.error {
        error!("Consent flow denied: {}", e);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "authentication failed" })),
        )
            .into_response();
    }
    let Some(code) = params.code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing authorization code" })),
        )
            .into_response();
    };

    let exchange = state
        .http
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await;

    let tokens: TokenResponse = match exchange {
        Ok(resp) if resp.status().is_success() => match resp.json().await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Malformed token response: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "authentication failed" })),
                )
                    .into_response();
            }
        },
        Ok(resp) => {
            error!("Token exchange rejected with status {}", resp.status());
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "authentication failed" })),
            )
                .into_response();
        }
        Err(e) => {
            error!("Token exchange failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "authentication failed" })),
            )
                .into_response();
        }
    };

    let mut headers = vec![(
        SET_COOKIE,
        cookie_header(ACCESS_COOKIE, &tokens.access_token, ACCESS_MAX_AGE_SECS),
    )];
    if let Some(refresh) = &tokens.refresh_token {
        headers.push((
            SET_COOKIE,
            cookie_header(REFRESH_COOKIE, refresh, REFRESH_MAX_AGE_SECS),
        ));
    }

    info!("Google account connected");
    (
        AppendHeaders(headers),
        Redirect::to("/admin?google_connected=true"),
    )
        .into_response()
}

/// Drop both Google cookies.
pub async fn clear() -> impl IntoResponse {
    let headers = vec![
        (SET_COOKIE, cookie_header(ACCESS_COOKIE, "", 0)),
        (SET_COOKIE, cookie_header(REFRESH_COOKIE, "", 0)),
    ];
    (AppendHeaders(headers), StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_carries_lifetime_and_flags() {
        let header = cookie_header(ACCESS_COOKIE, "tok", ACCESS_MAX_AGE_SECS);
        assert!(header.starts_with("google_access_token=tok;"));
        assert!(header.contains("Max-Age=3600"));
        assert!(header.contains("HttpOnly"));
    }

    #[test]
    fn cookie_values_with_delimiters_are_escaped() {
        let header = cookie_header(ACCESS_COOKIE, "a;b, c\"d%", 60);
        let value = header
            .strip_prefix("google_access_token=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        assert_eq!(value, "a%3Bb%2C%20c%22d%25");
    }
}
