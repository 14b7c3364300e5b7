use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{info, warn};

use keepsake_api::auth::seed_admin;
use keepsake_api::google::GoogleConfig;
use keepsake_api::AppStateInner;
use keepsake_db::Database;
use keepsake_storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keepsake=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("KEEPSAKE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("KEEPSAKE_DB_PATH").unwrap_or_else(|_| "keepsake.db".into());
    let media_dir = std::env::var("KEEPSAKE_MEDIA_DIR").unwrap_or_else(|_| "media".into());
    let public_base = std::env::var("KEEPSAKE_PUBLIC_BASE_URL").unwrap_or_default();
    let host = std::env::var("KEEPSAKE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("KEEPSAKE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let google = match (
        std::env::var("GOOGLE_CLIENT_ID"),
        std::env::var("GOOGLE_CLIENT_SECRET"),
        std::env::var("GOOGLE_REDIRECT_URL"),
    ) {
        (Ok(client_id), Ok(client_secret), Ok(redirect_url)) => Some(GoogleConfig {
            client_id,
            client_secret,
            redirect_url,
        }),
        _ => {
            warn!("Google credentials not set, Drive import disabled");
            None
        }
    };

    // Init database and storage
    let db = Database::open(&PathBuf::from(&db_path))?;

    let admin_email =
        std::env::var("KEEPSAKE_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let admin_password =
        std::env::var("KEEPSAKE_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me".into());
    seed_admin(&db, &admin_email, &admin_password)?;

    let storage = Storage::new(PathBuf::from(&media_dir), public_base).await?;

    let state = AppStateInner::new(db, storage, jwt_secret, google);
    let app = keepsake_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Keepsake server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
