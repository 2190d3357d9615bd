//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use backfill::BackfillOrchestrator;
use broadcaster::Broadcaster;
use collectors::catalog::ExchangeAddressCatalog;
use collectors::esplora::EsploraClient;
use collectors::perp_client::PerpClient;
use collectors::rpc::EvmRpcClient;
use collectors::{EvmCollector, PerpCollector, UtxoCollector};
use copier::{BacktestService, LiveCopier};
use metrics_engine::MetricsEngine;
use price_oracle::PriceOracle;
use whale_core::config::Config;
use whale_core::Result;

/// Shared application state, built once at startup and handed to every
/// handler behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub broadcaster: Arc<Broadcaster>,
    pub price_oracle: Arc<PriceOracle>,
    pub metrics: Arc<MetricsEngine>,
    pub backfill: Arc<BackfillOrchestrator>,
    pub backtest_service: Arc<BacktestService>,
    pub live_copier: Arc<LiveCopier>,
    pub evm: Arc<EvmCollector>,
    pub utxo: Arc<UtxoCollector>,
    pub perp: Arc<PerpCollector>,
}

impl AppState {
    pub async fn new(config: Config, pool: PgPool) -> Result<Self> {
        let broadcaster = Arc::new(Broadcaster::new());
        let price_oracle = Arc::new(PriceOracle::new(&config.price_oracle, pool.clone()));
        let metrics = Arc::new(MetricsEngine::new(pool.clone(), price_oracle.clone()));

        let catalog = Arc::new(ExchangeAddressCatalog::seed());

        let rpc = Arc::new(EvmRpcClient::new(config.evm.rpc_http_url.clone().unwrap_or_default()));
        let esplora = Arc::new(EsploraClient::new(config.utxo.api_base_url.clone().unwrap_or_default()));
        let perp_client = Arc::new(PerpClient::new(config.perp.info_url.clone().unwrap_or_default()));

        let sink: Arc<dyn whale_core::sink::EventSink> = broadcaster.clone();

        let evm = Arc::new(EvmCollector::new(
            pool.clone(),
            rpc,
            price_oracle.clone(),
            catalog.clone(),
            config.thresholds.clone(),
            sink.clone(),
            metrics.clone(),
        ));
        let utxo = Arc::new(UtxoCollector::new(
            pool.clone(),
            esplora,
            price_oracle.clone(),
            catalog,
            config.thresholds.clone(),
            sink.clone(),
            metrics.clone(),
        ));
        let perp = Arc::new(PerpCollector::new(
            pool.clone(),
            perp_client,
            price_oracle.clone(),
            config.thresholds.clone(),
            sink,
            metrics.clone(),
        ));

        let backfill = Arc::new(BackfillOrchestrator::new(pool.clone(), evm.clone(), utxo.clone(), perp.clone(), metrics.clone()));
        let backtest_service = Arc::new(BacktestService::new(pool.clone(), price_oracle.clone()));
        let live_copier = Arc::new(LiveCopier::new(pool.clone()));

        Ok(Self {
            pool,
            config: Arc::new(config),
            broadcaster,
            price_oracle,
            metrics,
            backfill,
            backtest_service,
            live_copier,
            evm,
            utxo,
            perp,
        })
    }
}
