//! Recent-event feed handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use whale_core::db::events::EventRepository;
use whale_core::types::{Event, EventType};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub summary: String,
    pub value_usd: Decimal,
    pub tx_hash: Option<String>,
    pub details: Value,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        let event_type = match e.event_type {
            EventType::LargeSwap => "large_swap",
            EventType::LargeTransfer => "large_transfer",
            EventType::ExchangeFlow => "exchange_flow",
            EventType::PerpTrade => "perp_trade",
        };
        Self {
            id: e.id,
            whale_id: e.whale_id,
            timestamp: e.timestamp,
            event_type: event_type.to_string(),
            summary: e.summary,
            value_usd: e.value_usd,
            tx_hash: e.tx_hash,
            details: e.details,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentEventsQuery {
    pub limit: Option<i64>,
}

/// Most recent events across all tracked whales.
#[utoipa::path(
    get,
    path = "/api/v1/events/recent",
    tag = "events",
    params(RecentEventsQuery),
    responses((status = 200, description = "Recent events", body = [EventResponse]))
)]
pub async fn recent(State(state): State<Arc<AppState>>, Query(q): Query<RecentEventsQuery>) -> ApiResult<Json<Vec<EventResponse>>> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let events = EventRepository::new(state.pool.clone()).recent(None, limit).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// Same recency query as `/events/recent`, kept as a distinct path so a
/// dashboard can poll a "live" feed independent of a historical view.
#[utoipa::path(
    get,
    path = "/api/v1/events/live",
    tag = "events",
    params(RecentEventsQuery),
    responses((status = 200, description = "Live events", body = [EventResponse]))
)]
pub async fn live(State(state): State<Arc<AppState>>, Query(q): Query<RecentEventsQuery>) -> ApiResult<Json<Vec<EventResponse>>> {
    recent(State(state), Query(q)).await
}
