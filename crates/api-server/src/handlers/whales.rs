//! Whale registry handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use whale_core::db::metrics::MetricsRepository;
use whale_core::db::whales::WhaleRepository;
use whale_core::types::{Chain, NewWhale, Whale, WhaleClassification, WhaleFilters};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn classification_str(c: WhaleClassification) -> &'static str {
    match c {
        WhaleClassification::Unclassified => "unclassified",
        WhaleClassification::Holder => "holder",
        WhaleClassification::Trader => "trader",
        WhaleClassification::HolderTrader => "holder_trader",
    }
}

fn parse_classification(s: &str) -> Option<WhaleClassification> {
    match s {
        "unclassified" => Some(WhaleClassification::Unclassified),
        "holder" => Some(WhaleClassification::Holder),
        "trader" => Some(WhaleClassification::Trader),
        "holder_trader" => Some(WhaleClassification::HolderTrader),
        _ => None,
    }
}

/// A whale plus the display fields computed from its latest metrics row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WhaleSummary {
    pub id: Uuid,
    pub chain: String,
    pub address: String,
    pub classification: String,
    pub labels: Vec<String>,
    pub first_seen: chrono::DateTime<Utc>,
    pub last_active: chrono::DateTime<Utc>,
    pub explorer_url: String,
    pub current_roi_percent: Option<Decimal>,
    pub portfolio_value_usd: Option<Decimal>,
    pub volume_1d_usd: Option<Decimal>,
}

impl WhaleSummary {
    pub(crate) async fn build(state: &AppState, whale: Whale) -> ApiResult<Self> {
        let explorer_url = whale.explorer_url();
        let metrics = MetricsRepository::new(state.pool.clone()).current(whale.id).await?;
        Ok(Self {
            id: whale.id,
            chain: whale.chain.as_str().to_string(),
            address: whale.address,
            classification: classification_str(whale.classification).to_string(),
            labels: whale.labels,
            first_seen: whale.first_seen,
            last_active: whale.last_active,
            explorer_url,
            current_roi_percent: metrics.as_ref().map(|m| m.roi_percent),
            portfolio_value_usd: metrics.as_ref().map(|m| m.portfolio_value_usd),
            volume_1d_usd: metrics.map(|m| m.volume_1d_usd),
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListWhalesQuery {
    pub chain: Option<String>,
    #[serde(rename = "type")]
    pub classification: Option<String>,
    #[serde(rename = "minRoi")]
    pub min_roi: Option<f64>,
    #[serde(rename = "activityWindow")]
    pub activity_window: Option<i64>,
    pub search: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WhaleListResponse {
    pub items: Vec<WhaleSummary>,
    pub total: i64,
}

/// List tracked whales, filterable by chain/type/ROI/activity/search.
///
/// `WhaleRepository::list` only filters on chain and classification at the
/// SQL layer; `minRoi`/`activityWindow`/`search` are applied afterward on
/// the fetched page, same as the live-trades `since` filter.
#[utoipa::path(
    get,
    path = "/api/v1/whales",
    tag = "whales",
    params(ListWhalesQuery),
    responses((status = 200, description = "Whale list", body = WhaleListResponse))
)]
pub async fn list(State(state): State<Arc<AppState>>, Query(q): Query<ListWhalesQuery>) -> ApiResult<Json<WhaleListResponse>> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let needs_post_filter = q.min_roi.is_some() || q.activity_window.is_some() || q.search.is_some() || q.sort_by.is_some();

    let chain = q.chain.as_deref().and_then(|s| s.parse::<Chain>().ok());
    let classification = q.classification.as_deref().and_then(parse_classification);
    let filters = WhaleFilters { chain, classification, min_roi: None, activity_window_days: None, search: None };
    let repo = WhaleRepository::new(state.pool.clone());

    let (whales, total) = if needs_post_filter {
        let (all, _) = repo.list(&filters, 10_000, 0).await?;
        let mut summaries = Vec::with_capacity(all.len());
        for whale in all {
            summaries.push(WhaleSummary::build(&state, whale).await?);
        }

        if let Some(min_roi) = q.min_roi.and_then(|v| Decimal::try_from(v).ok()) {
            summaries.retain(|s| s.current_roi_percent.map_or(false, |roi| roi >= min_roi));
        }
        if let Some(days) = q.activity_window {
            let cutoff = Utc::now() - chrono::Duration::days(days);
            summaries.retain(|s| s.last_active >= cutoff);
        }
        if let Some(search) = &q.search {
            let needle = search.to_lowercase();
            summaries.retain(|s| s.address.to_lowercase().contains(&needle) || s.labels.iter().any(|l| l.to_lowercase().contains(&needle)));
        }

        match q.sort_by.as_deref() {
            Some("roi") => summaries.sort_by(|a, b| b.current_roi_percent.cmp(&a.current_roi_percent)),
            Some("portfolio_value") => summaries.sort_by(|a, b| b.portfolio_value_usd.cmp(&a.portfolio_value_usd)),
            Some("volume") => summaries.sort_by(|a, b| b.volume_1d_usd.cmp(&a.volume_1d_usd)),
            _ => {}
        }
        if q.sort_dir.as_deref() == Some("asc") {
            summaries.reverse();
        }

        let total = summaries.len() as i64;
        let page = summaries.into_iter().skip(offset as usize).take(limit as usize).collect();
        (page, total)
    } else {
        let (page, total) = repo.list(&filters, limit, offset).await?;
        let mut summaries = Vec::with_capacity(page.len());
        for whale in page {
            summaries.push(WhaleSummary::build(&state, whale).await?);
        }
        (summaries, total)
    };

    Ok(Json(WhaleListResponse { items: whales, total }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TopWhalesQuery {
    pub limit: Option<i64>,
}

/// Whales sorted by ROI descending.
#[utoipa::path(
    get,
    path = "/api/v1/whales/top",
    tag = "whales",
    params(TopWhalesQuery),
    responses((status = 200, description = "Top whales by ROI", body = [WhaleSummary]))
)]
pub async fn top(State(state): State<Arc<AppState>>, Query(q): Query<TopWhalesQuery>) -> ApiResult<Json<Vec<WhaleSummary>>> {
    let limit = q.limit.unwrap_or(20).clamp(1, 500) as usize;
    let repo = WhaleRepository::new(state.pool.clone());
    let (all, _) = repo.list(&WhaleFilters::default(), 10_000, 0).await?;

    let mut summaries = Vec::with_capacity(all.len());
    for whale in all {
        summaries.push(WhaleSummary::build(&state, whale).await?);
    }
    summaries.sort_by(|a, b| b.current_roi_percent.cmp(&a.current_roi_percent));
    summaries.truncate(limit);

    Ok(Json(summaries))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWhaleRequest {
    pub chain: String,
    pub address: String,
    pub labels: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub classification: Option<String>,
}

/// Register a whale and kick off its initial backfill.
#[utoipa::path(
    post,
    path = "/api/v1/whales",
    tag = "whales",
    request_body = CreateWhaleRequest,
    responses((status = 200, description = "Whale created", body = WhaleSummary))
)]
pub async fn create(State(state): State<Arc<AppState>>, Json(body): Json<CreateWhaleRequest>) -> ApiResult<Json<WhaleSummary>> {
    let chain: Chain = body.chain.parse().map_err(|_| ApiError::BadRequest(format!("unknown chain: {}", body.chain)))?;
    let classification = body.classification.as_deref().and_then(parse_classification);
    let new_whale = NewWhale { chain, address: body.address, labels: body.labels, classification };
    let repo = WhaleRepository::new(state.pool.clone());
    let whale = repo.find_or_create(new_whale.chain, &new_whale.address, new_whale.labels.unwrap_or_default(), new_whale.classification).await?;

    let backfill = state.backfill.clone();
    let whale_id = whale.id;
    tokio::spawn(async move {
        if let Err(e) = backfill.start_backfill(whale_id).await {
            tracing::warn!(whale_id = %whale_id, error = %e, "failed to start backfill for new whale");
        }
    });

    Ok(Json(WhaleSummary::build(&state, whale).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWhaleRequest {
    pub labels: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub classification: Option<String>,
}

/// Update a whale's labels and/or classification.
#[utoipa::path(
    patch,
    path = "/api/v1/whales/{id}",
    tag = "whales",
    responses((status = 200, description = "Whale updated", body = WhaleSummary))
)]
pub async fn update(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>, Json(body): Json<UpdateWhaleRequest>) -> ApiResult<Json<WhaleSummary>> {
    let repo = WhaleRepository::new(state.pool.clone());
    let _existing = repo.get(id).await?.ok_or_else(|| ApiError::NotFound(format!("whale {id}")))?;

    if let Some(labels) = body.labels {
        repo.set_labels(id, labels).await?;
    }
    if let Some(classification) = body.classification.as_deref().and_then(parse_classification) {
        repo.set_classification(id, classification).await?;
    }

    let whale = repo.get(id).await?.ok_or_else(|| ApiError::NotFound(format!("whale {id}")))?;
    Ok(Json(WhaleSummary::build(&state, whale).await?))
}

/// Remove a whale; cascades to its trades/events/holdings/metrics.
#[utoipa::path(
    delete,
    path = "/api/v1/whales/{id}",
    tag = "whales",
    responses((status = 204, description = "Whale deleted"))
)]
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<axum::http::StatusCode> {
    let repo = WhaleRepository::new(state.pool.clone());
    repo.get(id).await?.ok_or_else(|| ApiError::NotFound(format!("whale {id}")))?;
    repo.delete(id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Backfill status shape exposed to API clients; `state` is rendered as a
/// lowercase string rather than the internal `BackfillState` enum so the
/// API surface doesn't need `whale-core` to carry a `utoipa` dependency.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BackfillStatusResponse {
    pub status: String,
    pub progress: i16,
    pub message: Option<String>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<whale_core::types::BackfillStatus> for BackfillStatusResponse {
    fn from(s: whale_core::types::BackfillStatus) -> Self {
        let status = match s.state {
            whale_core::types::BackfillState::Idle => "idle",
            whale_core::types::BackfillState::Running => "running",
            whale_core::types::BackfillState::Done => "done",
            whale_core::types::BackfillState::Error => "error",
        };
        Self { status: status.to_string(), progress: s.progress, message: s.message, updated_at: s.updated_at }
    }
}

/// Current backfill status for a whale.
#[utoipa::path(
    get,
    path = "/api/v1/whales/{id}/backfill_status",
    tag = "whales",
    responses((status = 200, description = "Backfill status", body = BackfillStatusResponse))
)]
pub async fn backfill_status(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<BackfillStatusResponse>> {
    Ok(Json(state.backfill.get_status(id).await?.into()))
}

/// Start (or no-op resume) a whale's backfill.
#[utoipa::path(
    post,
    path = "/api/v1/whales/{id}/backfill",
    tag = "whales",
    responses((status = 200, description = "Backfill started", body = BackfillStatusResponse))
)]
pub async fn start_backfill(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<BackfillStatusResponse>> {
    Ok(Json(state.backfill.start_backfill(id).await?.into()))
}

/// Wipe and re-run a perp whale's ledger from scratch.
#[utoipa::path(
    post,
    path = "/api/v1/whales/{id}/reset_hyperliquid",
    tag = "whales",
    responses((status = 200, description = "Reset started", body = BackfillStatusResponse))
)]
pub async fn reset_hyperliquid(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<BackfillStatusResponse>> {
    Ok(Json(state.backfill.start_reset(id).await?.into()))
}
