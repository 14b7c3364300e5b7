use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use futures_util::future::join_all;
use tokio::task::spawn_blocking;
use tracing::{error, info};

use keepsake_db::models::MemoryRow;
use keepsake_types::api::{BrokenMedia, BrokenMediaResponse, CleanupRequest, CleanupResponse};

use crate::AppState;

/// Probe every memory's media and report the unreachable ones. Local blobs
/// are checked on disk, external URLs with a HEAD request; YouTube links are
/// skipped. Probes run concurrently.
pub async fn broken_media(
    State(state): State<AppState>,
) -> Result<Json<BrokenMediaResponse>, StatusCode> {
    let db_state = state.clone();
    let rows = spawn_blocking(move || db_state.db.list_memories())
        .await
        .map_err(|e| {
            error!("Diagnostics task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to list memories: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let candidates: Vec<MemoryRow> = rows
        .into_iter()
        .filter(|row| row.media_type != "youtube")
        .collect();
    let checked = candidates.len();

    let probes = candidates.into_iter().map(|row| {
        let state = state.clone();
        async move { probe(&state, row).await }
    });
    let broken: Vec<BrokenMedia> = join_all(probes).await.into_iter().flatten().collect();

    info!("Media check: {} of {} broken", broken.len(), checked);
    Ok(Json(BrokenMediaResponse { broken, checked }))
}

async fn probe(state: &AppState, row: MemoryRow) -> Option<BrokenMedia> {
    if let Some(key) = row.image_url.strip_prefix("/media/") {
        if state.storage.exists(key).await {
            return None;
        }
        return Some(BrokenMedia {
            id: row.id,
            image_url: row.image_url,
            status: None,
            error: Some("blob missing from storage".to_string()),
        });
    }

    match state.http.head(&row.image_url).send().await {
        Ok(resp) if resp.status().is_success() => None,
        Ok(resp) => Some(BrokenMedia {
            id: row.id,
            image_url: row.image_url,
            status: Some(resp.status().as_u16()),
            error: None,
        }),
        Err(e) => Some(BrokenMedia {
            id: row.id,
            image_url: row.image_url,
            status: None,
            error: Some(e.to_string()),
        }),
    }
}

/// Bulk-delete rows flagged by the media check.
pub async fn cleanup(
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>, StatusCode> {
    if req.ids.is_empty() {
        return Ok(Json(CleanupResponse { deleted: 0 }));
    }

    let db_state = state.clone();
    let deleted = spawn_blocking(move || db_state.db.delete_memories(&req.ids))
        .await
        .map_err(|e| {
            error!("Cleanup task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to delete memories: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!("Cleanup removed {} memories", deleted);
    Ok(Json(CleanupResponse { deleted }))
}
