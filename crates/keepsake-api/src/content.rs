use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tokio::task::spawn_blocking;
use tracing::{error, warn};

use keepsake_types::api::UpdateContentRequest;

use crate::AppState;

/// Every editable text on the site, keyed by slot. Read failures degrade to
/// an empty map so pages render with their built-in defaults.
pub async fn content_map(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    let db_state = state.clone();
    let rows = match spawn_blocking(move || db_state.db.all_content()).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!("Serving empty content map: {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("Serving empty content map: {}", e);
            Vec::new()
        }
    };
    Json(rows.into_iter().map(|row| (row.key, row.value)).collect())
}

pub async fn update_content(
    State(state): State<AppState>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<StatusCode, StatusCode> {
    if req.key.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db_state = state.clone();
    spawn_blocking(move || db_state.db.upsert_content(&req.key, &req.value))
        .await
        .map_err(|e| {
            error!("Content task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to save content: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(StatusCode::NO_CONTENT)
}
