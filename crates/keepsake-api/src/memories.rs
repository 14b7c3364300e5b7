use std::str::FromStr;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use tokio::task::spawn_blocking;
use tracing::{error, warn};
use uuid::Uuid;

use keepsake_db::models::MemoryRow;
use keepsake_types::api::{
    CreateYoutubeMemoryRequest, IngestReport, MemoryListResponse, MemoryResponse, OrderFailure,
    SetOrderRequest, SetOrderResponse, UpdateMemoryRequest,
};
use keepsake_types::models::MediaType;

use crate::ingest::{self, ImageConverter, IncomingFile, MemoryMeta};
use crate::AppState;

pub fn to_response(row: MemoryRow) -> MemoryResponse {
    let media_type = MediaType::from_str(&row.media_type).unwrap_or_else(|e| {
        warn!("Memory {} has a corrupt media type: {}", row.id, e);
        MediaType::Image
    });
    MemoryResponse {
        id: row.id,
        title: row.title,
        description: row.description,
        date: row.date,
        image_url: row.image_url,
        media_type,
        order_index: row.order_index,
        created_at: row.created_at,
    }
}

/// Placeholder gallery shown until the first real memory lands.
fn demo_memories() -> Vec<MemoryResponse> {
    let demo = |id: &str, title: &str, date: &str, url: &str| MemoryResponse {
        id: id.to_string(),
        title: title.to_string(),
        description: Some("Exemplo. Adicione suas próprias memórias no painel.".to_string()),
        date: date.to_string(),
        image_url: url.to_string(),
        media_type: MediaType::Image,
        order_index: 0,
        created_at: String::new(),
    };
    vec![
        demo(
            "demo-1",
            "Nosso primeiro encontro",
            "2023-10-14",
            "https://images.unsplash.com/photo-1518199266791-5375a83190b7?w=800",
        ),
        demo(
            "demo-2",
            "Pôr do sol na praia",
            "2023-12-20",
            "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?w=800",
        ),
    ]
}

/// Public listing. An empty or unreachable store degrades to the demo
/// gallery with `has_real: false` instead of an error page.
pub async fn list_memories(State(state): State<AppState>) -> Json<MemoryListResponse> {
    let db_state = state.clone();
    let rows = match spawn_blocking(move || db_state.db.list_memories()).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!("Falling back to demo memories: {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("Falling back to demo memories: {}", e);
            Vec::new()
        }
    };

    if rows.is_empty() {
        return Json(MemoryListResponse {
            items: demo_memories(),
            has_real: false,
        });
    }
    Json(MemoryListResponse {
        items: rows.into_iter().map(to_response).collect(),
        has_real: true,
    })
}

/// Multipart batch upload: `title`, optional `description`, optional `date`
/// (defaults to today) plus one or more file parts.
pub async fn upload_memories(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, StatusCode> {
    let mut title = String::new();
    let mut description: Option<String> = None;
    let mut date: Option<String> = None;
    let mut files: Vec<IncomingFile> = Vec::new();

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
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Failed to read file part {}: {}", file_name, e);
                StatusCode::BAD_REQUEST
            })?;
            files.push(IncomingFile {
                name: file_name,
                mime,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        match name.as_str() {
            "title" => title = value,
            "description" => {
                if !value.is_empty() {
                    description = Some(value);
                }
            }
            "date" => {
                if !value.is_empty() {
                    date = Some(value);
                }
            }
            other => warn!("Ignoring unknown multipart field {}", other),
        }
    }

    if title.trim().is_empty() || files.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let meta = MemoryMeta {
        title,
        description,
        date: date.unwrap_or_else(|| Utc::now().date_naive().to_string()),
    };
    let report = ingest::ingest_memory_batch(&state, files, &meta, &ImageConverter).await;
    Ok(Json(report))
}

pub async fn create_youtube_memory(
    State(state): State<AppState>,
    Json(req): Json<CreateYoutubeMemoryRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.trim().is_empty() || req.url.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let id = Uuid::new_v4().to_string();
    let db_state = state.clone();
    let row = {
        let id = id.clone();
        spawn_blocking(move || {
            db_state.db.insert_memory(
                &id,
                &req.title,
                req.description.as_deref(),
                &req.date,
                &req.url,
                MediaType::Youtube.as_str(),
            )?;
            db_state.db.get_memory(&id)
        })
        .await
        .map_err(|e| {
            error!("Create task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to create YouTube memory: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
    };

    let row = row.ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMemoryRequest>,
) -> Result<Json<MemoryResponse>, StatusCode> {
    let db_state = state.clone();
    let row = spawn_blocking(move || {
        let found =
            db_state
                .db
                .update_memory_fields(&id, &req.title, req.description.as_deref(), &req.date)?;
        if !found {
            return Ok(None);
        }
        db_state.db.get_memory(&id)
    })
    .await
    .map_err(|e| {
        error!("Update task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Failed to update memory: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    row.map(to_response).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Media replacement keeps the row and swaps the blob. The old blob is left
/// in place so existing clients holding the URL keep working.
pub async fn replace_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<MemoryResponse>, StatusCode> {
    let file = first_file(&mut multipart).await?;
    let (url, media_type) = ingest::store_replacement(&state, file, &ImageConverter)
        .await
        .map_err(|e| {
            warn!("Media replacement rejected: {}", e);
            StatusCode::UNPROCESSABLE_ENTITY
        })?;

    let db_state = state.clone();
    let row = spawn_blocking(move || {
        let found = db_state
            .db
            .update_memory_media(&id, &url, media_type.as_str())?;
        if !found {
            return Ok(None);
        }
        db_state.db.get_memory(&id)
    })
    .await
    .map_err(|e| {
        error!("Replace task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Failed to replace memory media: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    row.map(to_response).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let db_state = state.clone();
    let deleted = spawn_blocking(move || db_state.db.delete_memory(&id))
        .await
        .map_err(|e| {
            error!("Delete task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to delete memory: {}", e);
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
    let (updated, failed) = spawn_blocking(move || db_state.db.set_memory_order(&req.ids))
        .await
        .map_err(|e| {
            error!("Order task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to save memory order: {}", e);
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

/// Pull the first file part out of a multipart body.
pub async fn first_file(multipart: &mut Multipart) -> Result<IncomingFile, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let Some(file_name) = field.file_name() else {
            continue;
        };
        let file_name = file_name.to_string();
        let mime = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field
            .bytes()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        return Ok(IncomingFile {
            name: file_name,
            mime,
            bytes: bytes.to_vec(),
        });
    }
    Err(StatusCode::BAD_REQUEST)
}
