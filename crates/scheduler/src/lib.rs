//! Classifier & Scheduler
//!
//! Three periodic jobs sharing one process: daily classification, daily
//! full metrics rebuild, and a 5-minute price refresh. Each job is guarded
//! by its own lock so a slow run is skipped rather than overlapped by the
//! next tick, and a failing job logs and returns rather than taking the
//! process down with it.

pub mod classifier;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use metrics_engine::MetricsEngine;
use price_oracle::PriceOracle;
use whale_core::config::ClassifierConfig;
use whale_core::db::whales::WhaleRepository;
use whale_core::Result;

use classifier::Classifier;

const CLASSIFIER_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const METRICS_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const PRICE_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct Scheduler {
    pool: PgPool,
    metrics: Arc<MetricsEngine>,
    price_oracle: Arc<PriceOracle>,
    classifier: Classifier,
    classifier_lock: Mutex<()>,
    metrics_lock: Mutex<()>,
    price_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        pool: PgPool,
        metrics: Arc<MetricsEngine>,
        price_oracle: Arc<PriceOracle>,
        classifier_config: ClassifierConfig,
    ) -> Self {
        let classifier = Classifier::new(pool.clone(), classifier_config);
        Self {
            pool,
            metrics,
            price_oracle,
            classifier,
            classifier_lock: Mutex::new(()),
            metrics_lock: Mutex::new(()),
            price_lock: Mutex::new(()),
        }
    }

    /// Spawns the three job loops and returns immediately; the loops run
    /// for the lifetime of the returned handles.
    pub fn spawn(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let classifier = self.clone();
        let metrics = self.clone();
        let prices = self.clone();
        vec![
            tokio::spawn(async move { classifier.run_classifier_loop().await }),
            tokio::spawn(async move { metrics.run_metrics_loop().await }),
            tokio::spawn(async move { prices.run_price_refresh_loop().await }),
        ]
    }

    async fn run_classifier_loop(&self) {
        let mut ticker = tokio::time::interval(CLASSIFIER_INTERVAL);
        loop {
            ticker.tick().await;
            let Ok(_guard) = self.classifier_lock.try_lock() else {
                warn!("classifier job already running, skipping tick");
                continue;
            };
            info!("classifier job starting");
            if let Err(e) = self.classifier.run().await {
                error!(error = %e, "classifier job failed");
            } else {
                info!("classifier job finished");
            }
        }
    }

    async fn run_metrics_loop(&self) {
        let mut ticker = tokio::time::interval(METRICS_INTERVAL);
        loop {
            ticker.tick().await;
            let Ok(_guard) = self.metrics_lock.try_lock() else {
                warn!("metrics aggregator already running, skipping tick");
                continue;
            };
            info!("metrics aggregator starting");
            if let Err(e) = self.rebuild_all().await {
                error!(error = %e, "metrics aggregator failed");
            } else {
                info!("metrics aggregator finished");
            }
        }
    }

    async fn rebuild_all(&self) -> Result<()> {
        let whales = WhaleRepository::new(self.pool.clone());
        let page_size = 500;
        let mut offset = 0;
        loop {
            let (page, total) = whales.list(&Default::default(), page_size, offset).await?;
            if page.is_empty() {
                break;
            }
            for whale in &page {
                if let Err(e) = self.metrics.full_rebuild(whale.id).await {
                    warn!(whale_id = %whale.id, error = %e, "metrics rebuild failed for whale");
                }
            }
            offset += page_size;
            if offset >= total {
                break;
            }
        }
        Ok(())
    }

    async fn run_price_refresh_loop(&self) {
        let mut ticker = tokio::time::interval(PRICE_REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            let Ok(_guard) = self.price_lock.try_lock() else {
                warn!("price refresh already running, skipping tick");
                continue;
            };
            match self.tracked_assets().await {
                Ok(assets) if !assets.is_empty() => {
                    if let Err(e) = self.price_oracle.refresh(&assets).await {
                        error!(error = %e, "price refresh failed");
                    }
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "failed to load tracked assets"),
            }
        }
    }

    /// Distinct base assets traded by any whale, refreshed each tick since
    /// the tracked set changes as new whales are added.
    async fn tracked_assets(&self) -> Result<Vec<String>> {
        let assets: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT base_asset FROM trades").fetch_all(&self.pool).await?;
        Ok(assets)
    }
}
