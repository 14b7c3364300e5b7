pub mod auth;
pub mod content;
pub mod coupons;
pub mod diagnostics;
pub mod google;
pub mod guard;
pub mod import;
pub mod ingest;
pub mod memories;
pub mod pages;
pub mod reasons;
pub mod reel;
pub mod stories;
pub mod timer;
pub mod version;

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use keepsake_db::Database;
use keepsake_storage::Storage;

/// 50 MB upload limit for media batches
const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
    pub google: Option<google::GoogleConfig>,
    pub http: reqwest::Client,
    /// Last reason handed out, so consecutive picks never repeat.
    pub last_reason: Mutex<Option<String>>,
}

impl AppStateInner {
    pub fn new(
        db: Database,
        storage: Storage,
        jwt_secret: String,
        google: Option<google::GoogleConfig>,
    ) -> AppState {
        Arc::new(Self {
            db,
            storage,
            jwt_secret,
            google,
            http: reqwest::Client::new(),
            last_reason: Mutex::new(None),
        })
    }
}

/// Assemble the full application router: public API, session-guarded pages,
/// auth-gated admin API and the media directory.
pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/api/health", get(version::health))
        .route("/api/version", get(version::version))
        .route("/api/memories", get(memories::list_memories))
        .route("/api/stories", get(stories::list_stories))
        .route("/api/coupons", get(coupons::list_coupons))
        .route("/api/coupons/{id}/redeem", post(coupons::redeem_coupon))
        .route("/api/content", get(content::content_map))
        .route("/api/reasons/random", get(reasons::random_reason))
        .route("/api/timer", get(timer::timer))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/google", get(google::start))
        .route("/api/auth/google/callback", get(google::callback))
        .route("/api/auth/google/clear", get(google::clear));

    let admin_api = Router::new()
        .route("/api/memories", post(memories::upload_memories))
        .route("/api/memories/youtube", post(memories::create_youtube_memory))
        .route("/api/memories/order", put(memories::set_order))
        .route(
            "/api/memories/{id}",
            put(memories::update_memory).delete(memories::delete_memory),
        )
        .route("/api/memories/{id}/media", put(memories::replace_media))
        .route("/api/stories", post(stories::upload_stories))
        .route("/api/stories/order", put(stories::set_order))
        .route(
            "/api/stories/{id}",
            put(stories::update_story).delete(stories::delete_story),
        )
        .route("/api/stories/{id}/media", put(stories::replace_media))
        .route("/api/content", put(content::update_content))
        .route("/api/import-from-url", post(import::import_from_url))
        .route("/api/diagnostics/broken-media", get(diagnostics::broken_media))
        .route("/api/diagnostics/cleanup", post(diagnostics::cleanup))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_auth,
        ));

    // No /login page: the guard sends anonymous visitors to the gallery
    // (where the login modal lives) and logged-in ones to /admin.
    let page_routes = Router::new()
        .route("/", get(pages::home))
        .route("/admin", get(pages::admin))
        .route("/cupons", get(pages::coupons))
        .route("/raspadinha", get(pages::scratch));

    Router::new()
        .merge(public_api)
        .merge(admin_api)
        .merge(page_routes)
        .nest_service("/media", ServeDir::new(state.storage.dir()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::session_guard,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
