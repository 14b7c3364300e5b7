use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tokio::task::spawn_blocking;
use tracing::{error, warn};

use keepsake_db::models::StoryRow;
use keepsake_types::api::{
    IngestReport, OrderFailure, SetOrderRequest, SetOrderResponse, StoryResponse,
    UpdateStoryRequest,
};
use keepsake_types::models::{clamp_zoom, LayoutType};

use crate::ingest::{self, ImageConverter, StoryMeta};
use crate::memories::first_file;
use crate::AppState;

pub fn to_response(row: StoryRow) -> StoryResponse {
    let layout_type = LayoutType::from_str(&row.layout_type).unwrap_or_else(|e| {
        warn!("Story {} has a corrupt layout: {}", row.id, e);
        LayoutType::TextOverlay
    });
    StoryResponse {
        id: row.id,
        image_url: row.image_url,
        text_content: row.text_content,
        order_index: row.order_index,
        layout_type,
        zoom_level: row.zoom_level,
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub shuffle: bool,
}

/// Curated order by default; `?shuffle=true` returns a fresh random order
/// per request for reel-style playback.
pub async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<StoryResponse>>, StatusCode> {
    let db_state = state.clone();
    let rows = spawn_blocking(move || db_state.db.list_stories())
        .await
        .map_err(|e| {
            error!("List task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to list stories: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let mut stories: Vec<StoryResponse> = rows.into_iter().map(to_response).collect();
    if params.shuffle {
        stories.shuffle(&mut rand::rng());
    }
    Ok(Json(stories))
}

/// Multipart batch upload: optional `text_content`, `layout_type` and
/// `zoom_level` fields apply to every file part in the batch.
pub async fn upload_stories(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, StatusCode> {
    let mut text_content = String::new();
    let mut layout_type = LayoutType::TextOverlay;
    let mut zoom_level = 1.0;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body: {}", e);
        StatusCode::BAD_REQUEST
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            let file_name = file_name.to_string();
            let mime = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| {
                    mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string()
                });
            let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            files.push(crate::ingest::IncomingFile {
                name: file_name,
                mime,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        match name.as_str() {
            "text_content" => text_content = value,
            "layout_type" => {
                layout_type = value.parse().map_err(|e| {
                    warn!("Rejected story upload: {}", e);
                    StatusCode::BAD_REQUEST
                })?;
            }
            "zoom_level" => {
                zoom_level = value.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            other => warn!("Ignoring unknown multipart field {}", other),
        }
    }

    if files.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let meta = StoryMeta {
        text_content,
        layout_type,
        zoom_level: clamp_zoom(zoom_level),
    };
    let report = ingest::ingest_story_batch(&state, files, &meta, &ImageConverter).await;
    Ok(Json(report))
}

pub async fn update_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStoryRequest>,
) -> Result<Json<StoryResponse>, StatusCode> {
    let db_state = state.clone();
    let row = spawn_blocking(move || {
        let found = db_state.db.update_story(
            &id,
            &req.text_content,
            req.layout_type.as_str(),
            clamp_zoom(req.zoom_level),
        )?;
        if !found {
            return Ok(None);
        }
        db_state.db.get_story(&id)
    })
    .await
    .map_err(|e| {
        error!("Update task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Failed to update story: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    row.map(to_response).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn replace_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<StoryResponse>, StatusCode> {
    let file = first_file(&mut multipart).await?;
    let (url, media_type) = ingest::store_replacement(&state, file, &ImageConverter)
        .await
        .map_err(|e| {
            warn!("Media replacement rejected: {}", e);
            StatusCode::UNPROCESSABLE_ENTITY
        })?;
    if media_type == keepsake_types::models::MediaType::Video {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let db_state = state.clone();
    let row = spawn_blocking(move || {
        let found = db_state.db.update_story_media(&id, &url)?;
        if !found {
            return Ok(None);
        }
        db_state.db.get_story(&id)
    })
    .await
    .map_err(|e| {
        error!("Replace task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Failed to replace story media: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    row.map(to_response).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let db_state = state.clone();
    let deleted = spawn_blocking(move || db_state.db.delete_story(&id))
        .await
        .map_err(|e| {
            error!("Delete task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to delete story: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

pub async fn set_order(
    State(state): State<AppState>,
    Json(req): Json<SetOrderRequest>,
) -> Result<Json<SetOrderResponse>, StatusCode> {
    let db_state = state.clone();
    let (updated, failed) = spawn_blocking(move || db_state.db.set_story_order(&req.ids))
        .await
        .map_err(|e| {
            error!("Order task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to save story order: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(SetOrderResponse {
        updated,
        failed: failed
            .into_iter()
            .map(|(id, error)| OrderFailure { id, error })
            .collect(),
    }))
}
