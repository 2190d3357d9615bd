//! Copier backtest and live-shadow session handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use whale_core::db::trades::TradeRepository;
use whale_core::types::BacktestParams;

use super::wallets::{resolve_whale_id, TradeResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BacktestRequest {
    pub chain: String,
    pub address: String,
    pub initial_deposit: Decimal,
    pub position_pct: Decimal,
    pub fee_bps: Decimal,
    pub slippage_bps: Decimal,
    pub leverage: Decimal,
    pub assets: Option<Vec<String>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EquityPointResponse {
    pub timestamp: DateTime<Utc>,
    pub equity_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CopyTradeRowResponse {
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub direction: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee_usd: Decimal,
    pub slippage_usd: Decimal,
    pub realized_pnl_usd: Option<Decimal>,
    pub cumulative_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub equity_usd: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BacktestRunResponse {
    pub run_id: Uuid,
    pub recommended_position_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub max_drawdown_usd: Decimal,
    pub roi_percent: Decimal,
    pub net_pnl_usd: Decimal,
    pub trade_count: i64,
    pub equity_curve: Vec<EquityPointResponse>,
    pub trades: Vec<CopyTradeRowResponse>,
}

/// Runs a copier backtest for a whale's historical trades and persists the
/// run summary so a live session can be started against it afterward.
#[utoipa::path(
    post,
    path = "/api/v1/backtest/copier",
    tag = "backtest",
    request_body = BacktestRequest,
    responses((status = 200, description = "Backtest summary, equity curve and trade log", body = BacktestRunResponse))
)]
pub async fn run_copier_backtest(State(state): State<Arc<AppState>>, Json(req): Json<BacktestRequest>) -> ApiResult<Json<BacktestRunResponse>> {
    if req.initial_deposit <= Decimal::ZERO {
        return Err(ApiError::BadRequest("initial_deposit must be positive".into()));
    }

    let whale_id = resolve_whale_id(&state, &req.chain, &req.address).await?;
    let params = BacktestParams {
        initial_deposit: req.initial_deposit,
        position_pct: req.position_pct,
        fee_bps: req.fee_bps,
        slippage_bps: req.slippage_bps,
        leverage: req.leverage,
        assets: req.assets,
        from: req.from,
        to: req.to,
    };

    let (run, result) = state.backtest_service.run_and_save(whale_id, params).await?;

    Ok(Json(BacktestRunResponse {
        run_id: run.id,
        recommended_position_pct: result.recommended_position_pct,
        max_drawdown_pct: result.max_drawdown_pct,
        max_drawdown_usd: result.max_drawdown_usd,
        roi_percent: result.roi_percent,
        net_pnl_usd: result.net_pnl_usd,
        trade_count: result.trade_count,
        equity_curve: result.equity_curve.into_iter().map(|p| EquityPointResponse { timestamp: p.timestamp, equity_usd: p.equity_usd }).collect(),
        trades: result
            .trades
            .into_iter()
            .map(|t| CopyTradeRowResponse {
                timestamp: t.timestamp,
                asset: t.asset,
                direction: super::wallets::direction_str(t.direction).to_string(),
                quantity: t.quantity,
                price: t.price,
                fee_usd: t.fee_usd,
                slippage_usd: t.slippage_usd,
                realized_pnl_usd: t.realized_pnl_usd,
                cumulative_pnl_usd: t.cumulative_pnl_usd,
                unrealized_pnl_usd: t.unrealized_pnl_usd,
                equity_usd: t.equity_usd,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartLiveRequest {
    pub chain: String,
    pub address: String,
    pub run_id: Uuid,
    pub position_pct_override: Decimal,
}

fn session_state_str(s: whale_core::types::CopierSessionState) -> &'static str {
    match s {
        whale_core::types::CopierSessionState::Created => "created",
        whale_core::types::CopierSessionState::Active => "active",
        whale_core::types::CopierSessionState::Stopped => "stopped",
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CopierSessionResponse {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub run_id: Uuid,
    pub state: String,
    pub processed_trades: i64,
    pub last_seen_trade_at: Option<DateTime<Utc>>,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<whale_core::types::CopierSession> for CopierSessionResponse {
    fn from(s: whale_core::types::CopierSession) -> Self {
        Self {
            id: s.id,
            whale_id: s.whale_id,
            run_id: s.run_id,
            state: session_state_str(s.state).to_string(),
            processed_trades: s.processed_trades,
            last_seen_trade_at: s.last_seen_trade_at,
            notifications: s.notifications,
            errors: s.errors,
            created_at: s.created_at,
        }
    }
}

/// Starts a shadow-only live copy session against a prior backtest run.
#[utoipa::path(
    post,
    path = "/api/v1/backtest/live/start",
    tag = "backtest",
    request_body = StartLiveRequest,
    responses((status = 200, description = "Live session started", body = CopierSessionResponse))
)]
pub async fn start_live(State(state): State<Arc<AppState>>, Json(req): Json<StartLiveRequest>) -> ApiResult<Json<CopierSessionResponse>> {
    let whale_id = resolve_whale_id(&state, &req.chain, &req.address).await?;
    let session = state.live_copier.start_session(whale_id, req.run_id, req.position_pct_override).await?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionIdQuery {
    pub session_id: Uuid,
}

/// Stops a running live copy session.
#[utoipa::path(
    post,
    path = "/api/v1/backtest/live/stop",
    tag = "backtest",
    params(SessionIdQuery),
    responses((status = 204, description = "Live session stopped"))
)]
pub async fn stop_live(State(state): State<Arc<AppState>>, Query(q): Query<SessionIdQuery>) -> ApiResult<axum::http::StatusCode> {
    state.live_copier.stop_session(q.session_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Fetches the status of a live copy session.
#[utoipa::path(
    get,
    path = "/api/v1/backtest/live/status",
    tag = "backtest",
    params(SessionIdQuery),
    responses((status = 200, description = "Session status", body = CopierSessionResponse))
)]
pub async fn live_status(State(state): State<Arc<AppState>>, Query(q): Query<SessionIdQuery>) -> ApiResult<Json<CopierSessionResponse>> {
    let session = whale_core::db::copier::CopierRepository::new(state.pool.clone())
        .get_session(q.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("copier session {}", q.session_id)))?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActiveSessionsQuery {
    pub chain: String,
    pub address: String,
}

/// Lists currently-active live sessions for a wallet.
#[utoipa::path(
    get,
    path = "/api/v1/backtest/live/active",
    tag = "backtest",
    params(ActiveSessionsQuery),
    responses((status = 200, description = "Active sessions", body = Vec<CopierSessionResponse>))
)]
pub async fn active_sessions(State(state): State<Arc<AppState>>, Query(q): Query<ActiveSessionsQuery>) -> ApiResult<Json<Vec<CopierSessionResponse>>> {
    let whale_id = resolve_whale_id(&state, &q.chain, &q.address).await?;
    let sessions = state.live_copier.list_active(whale_id).await?;
    Ok(Json(sessions.into_iter().map(CopierSessionResponse::from).collect()))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LiveTradesQuery {
    pub chain: String,
    pub address: String,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Raw trade fills for a whale since a timestamp, used by a live session's
/// dashboard to show what has been copied so far.
#[utoipa::path(
    get,
    path = "/api/v1/backtest/live-trades",
    tag = "backtest",
    params(LiveTradesQuery),
    responses((status = 200, description = "Trades since the given timestamp", body = Vec<TradeResponse>))
)]
pub async fn live_trades(State(state): State<Arc<AppState>>, Query(q): Query<LiveTradesQuery>) -> ApiResult<Json<Vec<TradeResponse>>> {
    let whale_id = resolve_whale_id(&state, &q.chain, &q.address).await?;
    let limit = q.limit.unwrap_or(100).clamp(1, 1000) as usize;

    let mut trades = TradeRepository::new(state.pool.clone()).all_ordered(whale_id).await?;
    if let Some(since) = q.since {
        trades.retain(|t| t.timestamp >= since);
    }
    trades.truncate(limit);

    Ok(Json(trades.into_iter().map(TradeResponse::from).collect()))
}
