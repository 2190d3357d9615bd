//! API route definitions.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{backtest, dashboard, events, health, wallets, whales};
use crate::state::AppState;
use crate::websocket;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Whale Tracker API",
        version = "1.0.0",
        description = "REST and WebSocket API for the crypto whale tracker"
    ),
    paths(
        health::health_check,
        health::readiness,
        dashboard::summary,
        whales::list,
        whales::top,
        whales::create,
        whales::update,
        whales::delete,
        whales::backfill_status,
        whales::start_backfill,
        whales::reset_hyperliquid,
        wallets::detail,
        wallets::roi_history,
        wallets::portfolio_history,
        wallets::trades,
        wallets::positions,
        events::recent,
        events::live,
        backtest::run_copier_backtest,
        backtest::start_live,
        backtest::stop_live,
        backtest::live_status,
        backtest::active_sessions,
        backtest::live_trades,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            health::HealthResponse,
            dashboard::DashboardSummary,
            whales::WhaleSummary,
            whales::WhaleListResponse,
            whales::CreateWhaleRequest,
            whales::UpdateWhaleRequest,
            whales::BackfillStatusResponse,
            wallets::WalletDetailResponse,
            wallets::WalletMetricsResponse,
            wallets::HoldingResponse,
            wallets::RoiPointResponse,
            wallets::RoiHistoryResponse,
            wallets::PortfolioPointResponse,
            wallets::PortfolioHistoryResponse,
            wallets::TradeResponse,
            wallets::TradesResponse,
            events::EventResponse,
            backtest::BacktestRequest,
            backtest::BacktestRunResponse,
            backtest::EquityPointResponse,
            backtest::CopyTradeRowResponse,
            backtest::StartLiveRequest,
            backtest::CopierSessionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health and readiness checks"),
        (name = "dashboard", description = "Tracker-wide summary counters"),
        (name = "whales", description = "Tracked whale registry"),
        (name = "wallets", description = "Per-wallet detail, metrics and trade history"),
        (name = "events", description = "Recent and live whale activity feed"),
        (name = "backtest", description = "Copier simulator: backtests and live-shadow sessions"),
        (name = "websocket", description = "Real-time WebSocket endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the main router. No authentication layer — this system has no
/// user/session model, so every route is reachable with only a generous
/// per-IP rate limit guarding it.
pub fn create_router(state: Arc<AppState>) -> Router {
    let read_rate_limit = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(60)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("failed to build read-path rate limiter config");

    let write_rate_limit = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(20)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("failed to build write-path rate limiter config");

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/events/ws/live", get(websocket::ws_live_events));

    let read_routes = Router::new()
        .route("/api/v1/dashboard/summary", get(dashboard::summary))
        .route("/api/v1/whales", get(whales::list))
        .route("/api/v1/whales/top", get(whales::top))
        .route("/api/v1/whales/:id/backfill_status", get(whales::backfill_status))
        .route("/api/v1/wallets/:chain/:address", get(wallets::detail))
        .route("/api/v1/wallets/:chain/:address/roi-history", get(wallets::roi_history))
        .route("/api/v1/wallets/:chain/:address/portfolio-history", get(wallets::portfolio_history))
        .route("/api/v1/wallets/:chain/:address/trades", get(wallets::trades))
        .route("/api/v1/wallets/:chain/:address/positions", get(wallets::positions))
        .route("/api/v1/events/recent", get(events::recent))
        .route("/api/v1/events/live", get(events::live))
        .route("/api/v1/backtest/live/status", get(backtest::live_status))
        .route("/api/v1/backtest/live/active", get(backtest::active_sessions))
        .route("/api/v1/backtest/live-trades", get(backtest::live_trades))
        .layer(GovernorLayer { config: Arc::new(read_rate_limit) });

    let write_routes = Router::new()
        .route("/api/v1/whales", post(whales::create))
        .route("/api/v1/whales/:id", axum::routing::patch(whales::update))
        .route("/api/v1/whales/:id", axum::routing::delete(whales::delete))
        .route("/api/v1/whales/:id/backfill", post(whales::start_backfill))
        .route("/api/v1/whales/:id/reset_hyperliquid", post(whales::reset_hyperliquid))
        .route("/api/v1/backtest/copier", post(backtest::run_copier_backtest))
        .route("/api/v1/backtest/live/start", post(backtest::start_live))
        .route("/api/v1/backtest/live/stop", post(backtest::stop_live))
        .layer(GovernorLayer { config: Arc::new(write_rate_limit) });

    Router::new()
        .merge(public_routes)
        .merge(read_routes)
        .merge(write_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_lists_core_tags() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("Whale Tracker API"));
        assert!(json.contains("whales"));
        assert!(json.contains("backtest"));
    }
}
