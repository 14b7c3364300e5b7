use std::path::Path;

use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use tokio::task::spawn_blocking;
use tracing::{error, info, warn};
use uuid::Uuid;

use keepsake_types::api::{FileOutcome, IngestReport};
use keepsake_types::models::{LayoutType, MediaType, clamp_zoom};

use crate::AppState;

pub const JPEG_QUALITY: u8 = 90;
const TOKEN_LEN: usize = 6;

/// One uploaded or downloaded file, before any normalization.
#[derive(Debug)]
pub struct IncomingFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub struct MemoryMeta {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
}

pub struct StoryMeta {
    pub text_content: String,
    pub layout_type: LayoutType,
    pub zoom_level: f64,
}

/// Converts a still image to JPEG. Behind a trait so tests can force
/// conversion failures without crafting real image payloads.
pub trait MediaConverter: Send + Sync {
    fn to_jpeg(&self, bytes: &[u8]) -> anyhow::Result<Vec<u8>>;
}

pub struct ImageConverter;

impl MediaConverter for ImageConverter {
    fn to_jpeg(&self, bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
        let img = image::load_from_memory(bytes)?;
        let mut out = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        img.write_with_encoder(encoder)?;
        Ok(out)
    }
}

pub fn is_heic(name: &str, mime: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with(".heic")
        || name.ends_with(".heif")
        || mime == "image/heic"
        || mime == "image/heif"
}

/// HEIC inputs become JPEG; everything else passes through untouched. A file
/// the converter cannot decode is rejected with an error naming it, so a
/// batch can skip it and move on.
pub fn normalize(file: IncomingFile, converter: &dyn MediaConverter) -> Result<IncomingFile, String> {
    if !is_heic(&file.name, &file.mime) {
        return Ok(file);
    }
    match converter.to_jpeg(&file.bytes) {
        Ok(bytes) => {
            info!("Converted {} to JPEG", file.name);
            Ok(IncomingFile {
                name: replace_ext_jpg(&file.name),
                mime: "image/jpeg".to_string(),
                bytes,
            })
        }
        Err(e) => Err(format!("could not convert {}: {}", file.name, e)),
    }
}

pub fn classify(mime: &str) -> MediaType {
    if mime.starts_with("video/") {
        MediaType::Video
    } else {
        MediaType::Image
    }
}

/// Storage key for a normalized file: millisecond timestamp plus a short
/// random token, keeping the original extension.
pub fn storage_key(name: &str) -> String {
    storage_key_with_prefix("", name)
}

pub fn storage_key_with_prefix(prefix: &str, name: &str) -> String {
    format!(
        "{}{}-{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        short_token(),
        extension_for(name)
    )
}

fn short_token() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), TOKEN_LEN)
        .to_ascii_lowercase()
}

fn extension_for(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

fn replace_ext_jpg(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}.jpg", &name[..dot]),
        None => format!("{}.jpg", name),
    }
}

/// Normalize, store and persist one memory file. Every failure becomes a
/// per-file outcome; nothing here aborts a batch.
pub async fn ingest_memory_file(
    state: &AppState,
    file: IncomingFile,
    meta: &MemoryMeta,
    key_prefix: &str,
    converter: &dyn MediaConverter,
) -> FileOutcome {
    let original_name = file.name.clone();

    let file = match normalize(file, converter) {
        Ok(file) => file,
        Err(e) => {
            warn!("Skipping {}: {}", original_name, e);
            return FileOutcome::failure(original_name, e);
        }
    };

    let media_type = classify(&file.mime);
    let key = storage_key_with_prefix(key_prefix, &file.name);
    if let Err(e) = state.storage.store(&key, &file.bytes).await {
        error!("Failed to store {}: {}", original_name, e);
        return FileOutcome::failure(original_name, e.to_string());
    }
    let url = state.storage.public_url(&key);

    let id = Uuid::new_v4().to_string();
    let db_state = state.clone();
    let row = {
        let id = id.clone();
        let url = url.clone();
        let title = meta.title.clone();
        let description = meta.description.clone();
        let date = meta.date.clone();
        spawn_blocking(move || {
            db_state.db.insert_memory(
                &id,
                &title,
                description.as_deref(),
                &date,
                &url,
                media_type.as_str(),
            )
        })
        .await
    };
    match row {
        Ok(Ok(())) => {
            info!("Ingested {} as memory {}", original_name, id);
            FileOutcome::success(original_name, id, url)
        }
        Ok(Err(e)) => {
            error!("Failed to persist {}: {}", original_name, e);
            FileOutcome::failure(original_name, e.to_string())
        }
        Err(e) => {
            error!("Ingest task for {} failed: {}", original_name, e);
            FileOutcome::failure(original_name, e.to_string())
        }
    }
}

pub async fn ingest_memory_batch(
    state: &AppState,
    files: Vec<IncomingFile>,
    meta: &MemoryMeta,
    converter: &dyn MediaConverter,
) -> IngestReport {
    let mut results = Vec::with_capacity(files.len());
    for file in files {
        results.push(ingest_memory_file(state, file, meta, "", converter).await);
    }
    IngestReport { results }
}

/// Stories are still images only; video payloads are skipped like any other
/// bad file.
pub async fn ingest_story_file(
    state: &AppState,
    file: IncomingFile,
    meta: &StoryMeta,
    converter: &dyn MediaConverter,
) -> FileOutcome {
    let original_name = file.name.clone();

    let file = match normalize(file, converter) {
        Ok(file) => file,
        Err(e) => {
            warn!("Skipping {}: {}", original_name, e);
            return FileOutcome::failure(original_name, e);
        }
    };
    if classify(&file.mime) == MediaType::Video {
        return FileOutcome::failure(original_name, "stories accept images only".to_string());
    }

    let key = storage_key(&file.name);
    if let Err(e) = state.storage.store(&key, &file.bytes).await {
        error!("Failed to store {}: {}", original_name, e);
        return FileOutcome::failure(original_name, e.to_string());
    }
    let url = state.storage.public_url(&key);

    let id = Uuid::new_v4().to_string();
    let db_state = state.clone();
    let row = {
        let id = id.clone();
        let url = url.clone();
        let text = meta.text_content.clone();
        let layout = meta.layout_type.as_str().to_string();
        let zoom = clamp_zoom(meta.zoom_level);
        spawn_blocking(move || db_state.db.insert_story(&id, &url, &text, &layout, zoom)).await
    };
    match row {
        Ok(Ok(())) => FileOutcome::success(original_name, id, url),
        Ok(Err(e)) => {
            error!("Failed to persist {}: {}", original_name, e);
            FileOutcome::failure(original_name, e.to_string())
        }
        Err(e) => {
            error!("Ingest task for {} failed: {}", original_name, e);
            FileOutcome::failure(original_name, e.to_string())
        }
    }
}

pub async fn ingest_story_batch(
    state: &AppState,
    files: Vec<IncomingFile>,
    meta: &StoryMeta,
    converter: &dyn MediaConverter,
) -> IngestReport {
    let mut results = Vec::with_capacity(files.len());
    for file in files {
        results.push(ingest_story_file(state, file, meta, converter).await);
    }
    IngestReport { results }
}

/// Normalize and store a replacement file, returning its public URL and
/// classification. Row updates are the caller's business.
pub async fn store_replacement(
    state: &AppState,
    file: IncomingFile,
    converter: &dyn MediaConverter,
) -> Result<(String, MediaType), String> {
    let file = normalize(file, converter)?;
    let media_type = classify(&file.mime);
    let key = storage_key(&file.name);
    state
        .storage
        .store(&key, &file.bytes)
        .await
        .map_err(|e| e.to_string())?;
    Ok((state.storage.public_url(&key), media_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppStateInner;
    use keepsake_db::Database;
    use keepsake_storage::Storage;

    struct StubConverter;
    impl MediaConverter for StubConverter {
        fn to_jpeg(&self, _bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xff, 0xd8, 0xff, 0xd9])
        }
    }

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();
        let storage = Storage::new(dir.path().join("media"), "").await.unwrap();
        let state = AppStateInner::new(db, storage, "test-secret".to_string(), None);
        (state, dir)
    }

    fn meta() -> MemoryMeta {
        MemoryMeta {
            title: "Trip".to_string(),
            description: None,
            date: "2024-05-01".to_string(),
        }
    }

    #[test]
    fn keys_keep_extension_and_stay_unique() {
        let a = storage_key("IMG_0001.JPG");
        let b = storage_key("IMG_0001.JPG");
        assert!(a.ends_with(".jpg"));
        assert_ne!(a, b);

        let (stamp, rest) = a.split_once('-').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(rest.len(), TOKEN_LEN + ".jpg".len());
    }

    #[test]
    fn keys_without_extension_get_a_fallback() {
        assert!(storage_key("blob").ends_with(".bin"));
    }

    #[test]
    fn import_keys_carry_their_prefix() {
        let key = storage_key_with_prefix("import-", "a.png");
        assert!(key.starts_with("import-"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn heic_detection_checks_name_and_mime() {
        assert!(is_heic("IMG.HEIC", "application/octet-stream"));
        assert!(is_heic("blob", "image/heic"));
        assert!(!is_heic("a.jpg", "image/jpeg"));
    }

    #[test]
    fn heic_conversion_renames_and_reclassifies() {
        let file = IncomingFile {
            name: "photo.heic".to_string(),
            mime: "image/heic".to_string(),
            bytes: vec![1, 2, 3],
        };
        let out = normalize(file, &StubConverter).unwrap();
        assert_eq!(out.name, "photo.jpg");
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!(classify(&out.mime), MediaType::Image);
    }

    #[test]
    fn undecodable_heic_is_rejected_by_name() {
        let file = IncomingFile {
            name: "broken.heic".to_string(),
            mime: "image/heic".to_string(),
            bytes: b"not an image".to_vec(),
        };
        let err = normalize(file, &ImageConverter).unwrap_err();
        assert!(err.contains("broken.heic"));
    }

    #[test]
    fn non_heic_passes_through_untouched() {
        let file = IncomingFile {
            name: "clip.mp4".to_string(),
            mime: "video/mp4".to_string(),
            bytes: vec![9, 9],
        };
        let out = normalize(file, &ImageConverter).unwrap();
        assert_eq!(out.name, "clip.mp4");
        assert_eq!(classify(&out.mime), MediaType::Video);
    }

    #[tokio::test]
    async fn batch_skips_the_bad_file_and_keeps_the_rest() {
        let (state, _dir) = test_state().await;
        let files = vec![
            IncomingFile {
                name: "a.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1],
            },
            IncomingFile {
                name: "b.heic".to_string(),
                mime: "image/heic".to_string(),
                bytes: b"garbage".to_vec(),
            },
            IncomingFile {
                name: "c.mp4".to_string(),
                mime: "video/mp4".to_string(),
                bytes: vec![2],
            },
        ];

        let report = ingest_memory_batch(&state, files, &meta(), &ImageConverter).await;
        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert_eq!(report.results[1].name, "b.heic");
        assert!(report.results[2].success);

        let rows = state.db.list_memories().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.order_index == 0));
        assert!(rows.iter().any(|r| r.media_type == "video"));
    }

    #[tokio::test]
    async fn story_ingest_refuses_video() {
        let (state, _dir) = test_state().await;
        let story_meta = StoryMeta {
            text_content: String::new(),
            layout_type: LayoutType::TextOverlay,
            zoom_level: 1.0,
        };
        let outcome = ingest_story_file(
            &state,
            IncomingFile {
                name: "clip.mp4".to_string(),
                mime: "video/mp4".to_string(),
                bytes: vec![1],
            },
            &story_meta,
            &ImageConverter,
        )
        .await;
        assert!(!outcome.success);
        assert!(state.db.list_stories().unwrap().is_empty());
    }

    #[tokio::test]
    async fn story_zoom_is_clamped_on_insert() {
        let (state, _dir) = test_state().await;
        let story_meta = StoryMeta {
            text_content: "hi".to_string(),
            layout_type: LayoutType::TextBottom,
            zoom_level: 9.0,
        };
        let outcome = ingest_story_file(
            &state,
            IncomingFile {
                name: "s.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1],
            },
            &story_meta,
            &ImageConverter,
        )
        .await;
        assert!(outcome.success);
        let rows = state.db.list_stories().unwrap();
        assert_eq!(rows[0].zoom_level, 2.0);
    }
}
