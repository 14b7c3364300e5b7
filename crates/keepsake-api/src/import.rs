use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::warn;

use keepsake_types::api::{FileOutcome, ImportFile, ImportRequest, IngestReport};

use crate::ingest::{self, ImageConverter, IncomingFile, MemoryMeta};
use crate::AppState;

const IMPORT_KEY_PREFIX: &str = "import-";

fn title_for(file: &ImportFile) -> String {
    Path::new(&file.name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_string())
        .unwrap_or_else(|| "Importado do Google".to_string())
}

/// Download each URL and run it through the regular ingest pipeline. A file
/// that fails to download is reported and skipped like any other bad file.
pub async fn import_from_url(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<IngestReport>, StatusCode> {
    if req.files.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let today = Utc::now().date_naive().to_string();
    let mut results = Vec::with_capacity(req.files.len());

    for file in req.files {
        let response = match state.http.get(&file.url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!("Download of {} returned {}", file.name, resp.status());
                results.push(FileOutcome::failure(
                    file.name,
                    format!("download failed with status {}", resp.status()),
                ));
                continue;
            }
            Err(e) => {
                warn!("Download of {} failed: {}", file.name, e);
                results.push(FileOutcome::failure(
                    file.name,
                    format!("download failed: {}", e),
                ));
                continue;
            }
        };

        let mime = file.mime_type.clone().unwrap_or_else(|| {
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
                .unwrap_or_else(|| {
                    mime_guess::from_path(&file.name)
                        .first_or_octet_stream()
                        .to_string()
                })
        });

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!("Download of {} was cut short: {}", file.name, e);
                results.push(FileOutcome::failure(
                    file.name,
                    format!("download failed: {}", e),
                ));
                continue;
            }
        };

        let meta = MemoryMeta {
            title: title_for(&file),
            description: Some("Importado via Google Picker".to_string()),
            date: today.clone(),
        };
        let incoming = IncomingFile {
            name: file.name,
            mime,
            bytes,
        };
        results.push(
            ingest::ingest_memory_file(&state, incoming, &meta, IMPORT_KEY_PREFIX, &ImageConverter)
                .await,
        );
    }

    Ok(Json(IngestReport { results }))
}
