use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tokio::task::spawn_blocking;
use tracing::{error, info};

use keepsake_db::models::CouponRow;
use keepsake_types::api::CouponResponse;

use crate::AppState;

fn to_response(row: CouponRow) -> CouponResponse {
    CouponResponse {
        id: row.id,
        title: row.title,
        description: row.description,
        emoji: row.emoji,
        is_redeemed: row.is_redeemed,
        redeemed_at: row.redeemed_at,
    }
}

pub async fn list_coupons(
    State(state): State<AppState>,
) -> Result<Json<Vec<CouponResponse>>, StatusCode> {
    let db_state = state.clone();
    let rows = spawn_blocking(move || db_state.db.list_coupons())
        .await
        .map_err(|e| {
            error!("List task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to list coupons: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// Redeeming is one-way and idempotent: the first call stamps `redeemed_at`,
/// every later call returns the coupon unchanged.
pub async fn redeem_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CouponResponse>, StatusCode> {
    let db_state = state.clone();
    let coupon_id = id.clone();
    let row = spawn_blocking(move || db_state.db.redeem_coupon(&coupon_id))
        .await
        .map_err(|e| {
            error!("Redeem task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Failed to redeem coupon {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let row = row.ok_or(StatusCode::NOT_FOUND)?;
    info!("Coupon {} redeemed", row.id);
    Ok(Json(to_response(row)))
}
