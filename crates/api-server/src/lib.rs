//! API Server
//!
//! REST and WebSocket API for the whale tracker.
//!
//! # Features
//!
//! - **REST API**: whale registry, wallet detail, events, copy-trading backtests
//! - **WebSocket**: live event feed
//! - **OpenAPI**: Auto-generated Swagger documentation at `/docs`
//!
//! # Example
//!
//! ```ignore
//! use api_server::{ApiServer, ServerConfig};
//!
//! let config = ServerConfig::default();
//! let server = ApiServer::new(config, whale_config, pool).await?;
//! server.run().await?;
//! ```

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use collectors::Collector;
use whale_core::config::Config as WhaleConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable CORS for all origins (development only).
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, cors_permissive: true }
    }
}

impl ServerConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            cors_permissive: std::env::var("CORS_PERMISSIVE").map(|v| v == "true").unwrap_or(true),
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().expect("invalid socket address")
    }
}

/// The API server.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

const COLLECTOR_TICK_INTERVAL: Duration = Duration::from_secs(30);

impl ApiServer {
    /// Create a new API server.
    pub async fn new(config: ServerConfig, whale_config: WhaleConfig, pool: PgPool) -> anyhow::Result<Self> {
        let state = AppState::new(whale_config, pool).await?;
        Ok(Self { config, state })
    }

    /// Run the server.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::new(self.state);

        let router = create_router(state.clone());
        let router = router
            .layer(
                TraceLayer::new_for_http()
                    .on_request(|request: &Request<_>, _span: &tracing::Span| {
                        tracing::info!(method = %request.method(), uri = %request.uri(), "incoming request");
                    })
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG))
                    .on_failure(
                        |error: tower_http::classify::ServerErrorsFailureClass, latency: std::time::Duration, _span: &tracing::Span| {
                            tracing::error!(error = %error, latency_ms = latency.as_millis(), "request failed");
                        },
                    ),
            )
            .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
            .layer(if self.config.cors_permissive {
                CorsLayer::permissive()
            } else {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            });

        if state.config.enable_ingestors {
            spawn_collector_loop(state.evm.clone());
            spawn_collector_loop(state.utxo.clone());
            spawn_collector_loop(state.perp.clone());
            info!("ingestor tick loops spawned");
        }

        if state.config.enable_scheduler {
            let scheduler = Arc::new(scheduler::Scheduler::new(
                state.pool.clone(),
                state.metrics.clone(),
                state.price_oracle.clone(),
                state.config.classifier.clone(),
            ));
            for handle in scheduler.spawn() {
                drop(handle);
            }
            info!("scheduler jobs spawned");
        }

        let addr = self.config.socket_addr();
        info!(address = %addr, "starting whale tracker api server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

fn spawn_collector_loop<C>(collector: Arc<C>)
where
    C: Collector + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(COLLECTOR_TICK_INTERVAL);
        loop {
            ticker.tick().await;
            match collector.tick().await {
                Ok(report) => {
                    if report.trades_persisted > 0 || report.events_emitted > 0 {
                        info!(
                            chain = ?collector.chain(),
                            whales = report.whales_processed,
                            trades = report.trades_persisted,
                            events = report.events_emitted,
                            decode_errors = report.decode_errors,
                            "collector tick complete"
                        );
                    }
                }
                Err(e) => tracing::warn!(chain = ?collector.chain(), error = %e, "collector tick failed"),
            }
        }
    });
}
