use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tokio::task::spawn_blocking;
use tracing::{error, info, warn};
use uuid::Uuid;

use keepsake_db::Database;
use keepsake_types::api::{Claims, LoginRequest, LoginResponse};

use crate::AppState;

pub const SESSION_COOKIE: &str = "keepsake_session";

const SESSION_DAYS: i64 = 30;

/// Ensure the admin account exists. Called once at startup; an existing row
/// with the same email is left alone.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<()> {
    if db.get_user_by_email(email)?.is_some() {
        return Ok(());
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    db.create_user(&Uuid::new_v4().to_string(), email, &hash)?;
    info!("Seeded admin account {}", email);
    Ok(())
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + Duration::days(SESSION_DAYS)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Session claims from the cookie jar, falling back to a bearer header.
pub fn session_claims(secret: &str, jar: &CookieJar, headers: &HeaderMap) -> Option<Claims> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(claims) = verify_token(secret, cookie.value()) {
            return Some(claims);
        }
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| verify_token(secret, token))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db_state = state.clone();
    let email = req.email.clone();
    let user = spawn_blocking(move || db_state.db.get_user_by_email(&email))
        .await
        .map_err(|e| {
            error!("Login task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // Unknown email and bad password both come back as a plain 401.
    let user = match user {
        Some(user) => user,
        None => {
            warn!("Login attempt for unknown email");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let parsed = PasswordHash::new(&user.password).map_err(|e| {
        error!("Stored password hash is malformed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .is_err()
    {
        warn!("Failed login for {}", user.email);
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id: Uuid = user.id.parse().map_err(|e| {
        error!("Corrupt user id {}: {}", user.id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let token = create_token(&state.jwt_secret, user_id, &user.email).map_err(|e| {
        error!("Failed to sign session token: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!("User {} logged in", user.email);
    Ok((
        jar.add(session_cookie(token)),
        Json(LoginResponse {
            user_id,
            email: user.email,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/").build())
        .remove(Cookie::build(crate::google::ACCESS_COOKIE).path("/").build())
        .remove(Cookie::build(crate::google::REFRESH_COOKIE).path("/").build());
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_claims() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "a@b.c").unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "a@b.c");
    }

    #[test]
    fn token_fails_with_wrong_secret() {
        let token = create_token("secret", Uuid::new_v4(), "a@b.c").unwrap();
        assert!(verify_token("other", &token).is_none());
    }

    #[test]
    fn seeding_twice_keeps_the_first_password() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();
        seed_admin(&db, "admin@example.com", "first").unwrap();
        let before = db.get_user_by_email("admin@example.com").unwrap().unwrap();
        seed_admin(&db, "admin@example.com", "second").unwrap();
        let after = db.get_user_by_email("admin@example.com").unwrap().unwrap();
        assert_eq!(before.password, after.password);
    }
}
