//! Wallet detail handlers: metrics, holdings, trade history, positions.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use whale_core::db::holdings::HoldingRepository;
use whale_core::db::metrics::MetricsRepository;
use whale_core::db::trades::TradeRepository;
use whale_core::db::whales::WhaleRepository;
use whale_core::types::{Chain, TradeDirection, TradeFilters, TradeSource};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub(crate) async fn resolve_whale_id(state: &AppState, chain: &str, address: &str) -> ApiResult<uuid::Uuid> {
    let chain: Chain = chain.parse().map_err(|_| ApiError::BadRequest(format!("unknown chain: {chain}")))?;
    let whale = WhaleRepository::new(state.pool.clone())
        .find_by_chain_address(chain, address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("wallet {chain}/{address}")))?;
    Ok(whale.id)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletMetricsResponse {
    pub as_of: DateTime<Utc>,
    pub portfolio_value_usd: Decimal,
    pub roi_percent: Decimal,
    pub realized_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub volume_1d_usd: Decimal,
    pub trades_1d: i64,
    pub win_rate_percent: Decimal,
}

impl From<whale_core::types::CurrentWalletMetrics> for WalletMetricsResponse {
    fn from(m: whale_core::types::CurrentWalletMetrics) -> Self {
        Self {
            as_of: m.as_of,
            portfolio_value_usd: m.portfolio_value_usd,
            roi_percent: m.roi_percent,
            realized_pnl_usd: m.realized_pnl_usd,
            unrealized_pnl_usd: m.unrealized_pnl_usd,
            volume_1d_usd: m.volume_1d_usd,
            trades_1d: m.trades_1d,
            win_rate_percent: m.win_rate_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HoldingResponse {
    pub asset: String,
    pub chain: String,
    pub amount: Decimal,
    pub usd_value: Option<Decimal>,
    pub portfolio_percent: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl From<whale_core::types::Holding> for HoldingResponse {
    fn from(h: whale_core::types::Holding) -> Self {
        Self {
            asset: h.asset,
            chain: h.chain.as_str().to_string(),
            amount: h.amount,
            usd_value: h.usd_value,
            portfolio_percent: h.portfolio_percent,
            updated_at: h.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletDetailResponse {
    pub wallet: super::whales::WhaleSummary,
    pub metrics: Option<WalletMetricsResponse>,
    pub holdings: Vec<HoldingResponse>,
    pub notes: Vec<String>,
}

/// Wallet detail: identity, latest metrics snapshot, current holdings.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{chain}/{address}",
    tag = "wallets",
    params(
        ("chain" = String, Path, description = "Chain: evm, utxo or perp"),
        ("address" = String, Path, description = "Wallet address")
    ),
    responses((status = 200, description = "Wallet detail", body = WalletDetailResponse))
)]
pub async fn detail(State(state): State<Arc<AppState>>, Path((chain, address)): Path<(String, String)>) -> ApiResult<Json<WalletDetailResponse>> {
    let chain_enum: Chain = chain.parse().map_err(|_| ApiError::BadRequest(format!("unknown chain: {chain}")))?;
    let whale = WhaleRepository::new(state.pool.clone())
        .find_by_chain_address(chain_enum, &address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("wallet {chain}/{address}")))?;

    let notes = whale.labels.clone();
    let wallet = super::whales::WhaleSummary::build(&state, whale.clone()).await?;
    let metrics = MetricsRepository::new(state.pool.clone()).current(whale.id).await?.map(WalletMetricsResponse::from);
    let holdings = HoldingRepository::new(state.pool.clone()).for_whale(whale.id).await?.into_iter().map(HoldingResponse::from).collect();

    Ok(Json(WalletDetailResponse { wallet, metrics, holdings, notes }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoiPointResponse {
    pub timestamp: DateTime<Utc>,
    pub roi_percent: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoiHistoryResponse {
    pub points: Vec<RoiPointResponse>,
}

/// ROI history, rebuilding metrics from scratch if none exist yet.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{chain}/{address}/roi-history",
    tag = "wallets",
    params(
        ("chain" = String, Path, description = "Chain: evm, utxo or perp"),
        ("address" = String, Path, description = "Wallet address"),
        HistoryQuery
    ),
    responses((status = 200, description = "ROI history", body = RoiHistoryResponse))
)]
pub async fn roi_history(
    State(state): State<Arc<AppState>>,
    Path((chain, address)): Path<(String, String)>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<RoiHistoryResponse>> {
    let whale_id = resolve_whale_id(&state, &chain, &address).await?;
    state.metrics.ensure_rebuilt(whale_id).await?;

    let days = q.days.unwrap_or(90).max(1);
    let since = (Utc::now() - chrono::Duration::days(days)).date_naive();
    let points = MetricsRepository::new(state.pool.clone())
        .roi_history(whale_id, since)
        .await?
        .into_iter()
        .map(|p| RoiPointResponse { timestamp: p.timestamp, roi_percent: p.roi_percent })
        .collect();

    Ok(Json(RoiHistoryResponse { points }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PortfolioPointResponse {
    pub timestamp: DateTime<Utc>,
    pub value_usd: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PortfolioHistoryResponse {
    pub points: Vec<PortfolioPointResponse>,
}

/// Portfolio value history, rebuilding metrics from scratch if none exist yet.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{chain}/{address}/portfolio-history",
    tag = "wallets",
    params(
        ("chain" = String, Path, description = "Chain: evm, utxo or perp"),
        ("address" = String, Path, description = "Wallet address"),
        HistoryQuery
    ),
    responses((status = 200, description = "Portfolio value history", body = PortfolioHistoryResponse))
)]
pub async fn portfolio_history(
    State(state): State<Arc<AppState>>,
    Path((chain, address)): Path<(String, String)>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<PortfolioHistoryResponse>> {
    let whale_id = resolve_whale_id(&state, &chain, &address).await?;
    state.metrics.ensure_rebuilt(whale_id).await?;

    let days = q.days.unwrap_or(90).max(1);
    let since = (Utc::now() - chrono::Duration::days(days)).date_naive();
    let points = MetricsRepository::new(state.pool.clone())
        .portfolio_history(whale_id, since)
        .await?
        .into_iter()
        .map(|p| PortfolioPointResponse { timestamp: p.timestamp, value_usd: p.value_usd })
        .collect();

    Ok(Json(PortfolioHistoryResponse { points }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TradesQuery {
    pub source: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TradeResponse {
    pub id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub platform: String,
    pub direction: String,
    pub base_asset: String,
    pub quote_asset: Option<String>,
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
    pub usd_notional: Option<Decimal>,
    pub realized_pnl_usd: Option<Decimal>,
    pub realized_pnl_percent: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub tx_hash: Option<String>,
}

fn source_str(s: TradeSource) -> &'static str {
    match s {
        TradeSource::Onchain => "onchain",
        TradeSource::Perp => "perp",
        TradeSource::ExchangeFlow => "exchange_flow",
    }
}

pub(crate) fn direction_str(d: TradeDirection) -> &'static str {
    match d {
        TradeDirection::Buy => "buy",
        TradeDirection::Sell => "sell",
        TradeDirection::Deposit => "deposit",
        TradeDirection::Withdraw => "withdraw",
        TradeDirection::Long => "long",
        TradeDirection::Short => "short",
        TradeDirection::CloseLong => "close_long",
        TradeDirection::CloseShort => "close_short",
    }
}

fn parse_source(s: &str) -> Option<TradeSource> {
    match s {
        "onchain" => Some(TradeSource::Onchain),
        "perp" => Some(TradeSource::Perp),
        "exchange_flow" => Some(TradeSource::ExchangeFlow),
        _ => None,
    }
}

fn parse_direction(s: &str) -> Option<TradeDirection> {
    match s {
        "buy" => Some(TradeDirection::Buy),
        "sell" => Some(TradeDirection::Sell),
        "deposit" => Some(TradeDirection::Deposit),
        "withdraw" => Some(TradeDirection::Withdraw),
        "long" => Some(TradeDirection::Long),
        "short" => Some(TradeDirection::Short),
        "close_long" => Some(TradeDirection::CloseLong),
        "close_short" => Some(TradeDirection::CloseShort),
        _ => None,
    }
}

impl From<whale_core::types::Trade> for TradeResponse {
    fn from(t: whale_core::types::Trade) -> Self {
        Self {
            id: t.id,
            timestamp: t.timestamp,
            source: source_str(t.source).to_string(),
            platform: t.platform,
            direction: direction_str(t.direction).to_string(),
            base_asset: t.base_asset,
            quote_asset: t.quote_asset,
            base_amount: t.base_amount,
            quote_amount: t.quote_amount,
            usd_notional: t.usd_notional,
            realized_pnl_usd: t.realized_pnl_usd,
            realized_pnl_percent: t.realized_pnl_percent,
            open_price: t.open_price,
            close_price: t.close_price,
            tx_hash: t.tx_hash,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TradesResponse {
    pub items: Vec<TradeResponse>,
    pub next_cursor: Option<String>,
    pub total: i64,
}

/// Cursor-paginated trade history for a wallet.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{chain}/{address}/trades",
    tag = "wallets",
    params(
        ("chain" = String, Path, description = "Chain: evm, utxo or perp"),
        ("address" = String, Path, description = "Wallet address"),
        TradesQuery
    ),
    responses((status = 200, description = "Trade history", body = TradesResponse))
)]
pub async fn trades(
    State(state): State<Arc<AppState>>,
    Path((chain, address)): Path<(String, String)>,
    Query(q): Query<TradesQuery>,
) -> ApiResult<Json<TradesResponse>> {
    let whale_id = resolve_whale_id(&state, &chain, &address).await?;

    let filters = TradeFilters {
        source: q.source.as_deref().and_then(parse_source),
        direction: q.direction.as_deref().and_then(parse_direction),
        chain: None,
        since: None,
        until: None,
    };
    let limit = q.limit.unwrap_or(50).clamp(1, 500);

    let (items, next_cursor, total) = TradeRepository::new(state.pool.clone()).query(whale_id, &filters, q.cursor.as_deref(), limit).await?;

    Ok(Json(TradesResponse { items: items.into_iter().map(TradeResponse::from).collect(), next_cursor, total }))
}

/// Open perp positions, derived from the current holdings snapshot. The
/// holdings snapshot is the source of truth for open positions; trade
/// fills remain the source of truth for historical PnL.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{chain}/{address}/positions",
    tag = "wallets",
    params(
        ("chain" = String, Path, description = "Chain: evm, utxo or perp"),
        ("address" = String, Path, description = "Wallet address")
    ),
    responses((status = 200, description = "Open perp positions", body = Vec<HoldingResponse>))
)]
pub async fn positions(State(state): State<Arc<AppState>>, Path((chain, address)): Path<(String, String)>) -> ApiResult<Json<Vec<HoldingResponse>>> {
    let whale_id = resolve_whale_id(&state, &chain, &address).await?;
    let holdings = HoldingRepository::new(state.pool.clone()).for_whale(whale_id).await?;
    let open: Vec<HoldingResponse> =
        holdings.into_iter().filter(|h| !h.amount.is_zero() && h.chain == Chain::Perp).map(HoldingResponse::from).collect();
    Ok(Json(open))
}
