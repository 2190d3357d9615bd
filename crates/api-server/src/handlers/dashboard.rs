//! Dashboard summary handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiResult;
use crate::state::AppState;

/// Top-line counters for the tracker landing page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub total_tracked_whales: i64,
    pub active_whales_24h: i64,
    pub total_volume_24h_usd: Decimal,
    pub perp_whales: i64,
}

/// Dashboard summary: whale counts and trailing 24h volume.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    tag = "dashboard",
    responses((status = 200, description = "Dashboard summary", body = DashboardSummary))
)]
pub async fn summary(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardSummary>> {
    let total_tracked_whales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whales").fetch_one(&state.pool).await?;

    let active_whales_24h: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM whales WHERE last_active >= now() - interval '24 hours'").fetch_one(&state.pool).await?;

    let perp_whales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whales WHERE chain = 'perp'").fetch_one(&state.pool).await?;

    let total_volume_24h_usd: Decimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(volume_1d_usd), 0) FROM current_wallet_metrics").fetch_one(&state.pool).await?;

    Ok(Json(DashboardSummary { total_tracked_whales, active_whales_24h, total_volume_24h_usd, perp_whales }))
}
