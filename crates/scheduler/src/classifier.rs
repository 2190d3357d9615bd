//! Whale classifier.
//!
//! Rules from the 30-day trading window: frequency >= F_hi and
//! volume/portfolio >= V_hi is a holder_trader; frequency >= F_hi alone is
//! a trader; otherwise a holder.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use whale_core::config::ClassifierConfig;
use whale_core::db::metrics::MetricsRepository;
use whale_core::db::trades::TradeRepository;
use whale_core::db::whales::WhaleRepository;
use whale_core::types::WhaleClassification;
use whale_core::Result;

const WINDOW_DAYS: i64 = 30;

pub struct Classifier {
    pool: PgPool,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(pool: PgPool, config: ClassifierConfig) -> Self {
        Self { pool, config }
    }

    /// Reclassifies every whale in the store. A failure on one whale is
    /// logged and skipped rather than aborting the rest of the run.
    pub async fn run(&self) -> Result<()> {
        let whales = WhaleRepository::new(self.pool.clone());
        let page_size = 500;
        let mut offset = 0;
        loop {
            let (page, total) = whales.list(&Default::default(), page_size, offset).await?;
            if page.is_empty() {
                break;
            }
            for whale in &page {
                if let Err(e) = self.classify_one(whale.id).await {
                    tracing::warn!(whale_id = %whale.id, error = %e, "classification failed");
                }
            }
            offset += page_size;
            if offset >= total {
                break;
            }
        }
        Ok(())
    }

    async fn classify_one(&self, whale_id: Uuid) -> Result<()> {
        let trades_repo = TradeRepository::new(self.pool.clone());
        let metrics_repo = MetricsRepository::new(self.pool.clone());
        let whales = WhaleRepository::new(self.pool.clone());

        let trades = trades_repo.all_ordered(whale_id).await?;

        let cutoff = Utc::now() - Duration::days(WINDOW_DAYS);
        let recent: Vec<_> = trades.iter().filter(|t| t.timestamp >= cutoff).collect();
        let frequency = recent.len() as i64;
        let volume: Decimal = recent.iter().filter_map(|t| t.usd_notional).map(|v| v.abs()).sum();

        let portfolio_value =
            metrics_repo.current(whale_id).await?.map(|m| m.portfolio_value_usd).unwrap_or(Decimal::ZERO);

        let classification = if frequency >= self.config.frequency_threshold {
            let is_high_volume = portfolio_value > Decimal::ZERO
                && (volume / portfolio_value) >= self.config.volume_ratio_threshold;
            if is_high_volume {
                WhaleClassification::HolderTrader
            } else {
                WhaleClassification::Trader
            }
        } else {
            WhaleClassification::Holder
        };

        whales.set_classification(whale_id, classification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_ratio_requires_positive_portfolio() {
        let portfolio_value = Decimal::ZERO;
        let volume = Decimal::from(1000);
        let is_high_volume = portfolio_value > Decimal::ZERO && (volume / Decimal::from(1).max(portfolio_value)) >= Decimal::from(1);
        assert!(!is_high_volume);
    }
}
