use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LayoutType, MediaType};

// -- JWT Claims --

/// Session claims shared by the login handler, the `require_auth` API layer
/// and the page-level session guard. Canonical definition lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
}

// -- Memories --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub image_url: String,
    pub media_type: MediaType,
    pub order_index: i64,
    pub created_at: String,
}

/// Public gallery listing. `has_real` is false when the demo fallback dataset
/// was substituted for an empty or unreachable store.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryListResponse {
    pub items: Vec<MemoryResponse>,
    pub has_real: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateYoutubeMemoryRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub url: String,
}

/// Non-media edit: fields are replaced wholesale, the blob/URL stays untouched.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMemoryRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
}

// -- Ordering --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetOrderRequest {
    pub ids: Vec<String>,
}

/// Outcome of an order save: per-row updates are independent, so a failure
/// leaves the remaining writes in place (no rollback).
#[derive(Debug, Serialize, Deserialize)]
pub struct SetOrderResponse {
    pub updated: usize,
    pub failed: Vec<OrderFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderFailure {
    pub id: String,
    pub error: String,
}

// -- Stories --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResponse {
    pub id: String,
    pub image_url: String,
    pub text_content: String,
    pub order_index: i64,
    pub layout_type: LayoutType,
    pub zoom_level: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStoryRequest {
    pub text_content: String,
    pub layout_type: LayoutType,
    pub zoom_level: f64,
}

// -- Ingestion --

/// Per-file result of a batch ingest. Every failure class skips only the
/// offending file; the batch always runs to completion.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestReport {
    pub results: Vec<FileOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileOutcome {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn success(name: String, id: String, url: String) -> Self {
        Self {
            name,
            success: true,
            id: Some(id),
            url: Some(url),
            error: None,
        }
    }

    pub fn failure(name: String, error: String) -> Self {
        Self {
            name,
            success: false,
            id: None,
            url: None,
            error: Some(error),
        }
    }
}

// -- URL import --

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub files: Vec<ImportFile>,
}

#[derive(Debug, Deserialize)]
pub struct ImportFile {
    pub url: String,
    pub name: String,
    pub mime_type: Option<String>,
}

// -- Coupons --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub is_redeemed: bool,
    pub redeemed_at: Option<String>,
}

// -- Site content --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    pub key: String,
    pub value: String,
}

// -- Love reasons --

#[derive(Debug, Serialize, Deserialize)]
pub struct ReasonResponse {
    pub texto: String,
}

// -- Timer --

#[derive(Debug, Serialize, Deserialize)]
pub struct TimerResponse {
    pub start: String,
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
}

// -- Version --

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

// -- Diagnostics --

#[derive(Debug, Serialize, Deserialize)]
pub struct BrokenMediaResponse {
    pub broken: Vec<BrokenMedia>,
    pub checked: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BrokenMedia {
    pub id: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub deleted: usize,
}
