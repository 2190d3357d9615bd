//! PERP collector: polls clearinghouse state (positions, equity) and fill
//! history, producing signed-size Trade rows for fills and replacing
//! Holding rows wholesale from the latest position snapshot. Per the
//! perp ledger ordering decision, position snapshots are authoritative
//! for the open-positions view and fills are authoritative for
//! historical PnL/metrics — the two are never cross-derived.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use metrics_engine::MetricsEngine;
use price_oracle::PriceOracle;
use whale_core::db::{
    checkpoints::CheckpointRepository, events::EventRepository, holdings::HoldingRepository, trades::TradeRepository,
    whales::WhaleRepository,
};
use whale_core::sink::EventSink;
use whale_core::types::{Chain, EventType, IngestionCheckpoint, NewEvent, NewHolding, NewTrade, TradeDirection, TradeSource};
use whale_core::{config::ThresholdConfig, Error, Result};

use crate::collector::{Collector, TickReport};
use crate::perp_client::{Fill, PerpClient};

pub struct PerpCollector {
    pool: PgPool,
    client: Arc<PerpClient>,
    price_oracle: Arc<PriceOracle>,
    thresholds: ThresholdConfig,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsEngine>,
    tracked: Arc<DashMap<Uuid, String>>,
}

impl PerpCollector {
    pub fn new(
        pool: PgPool,
        client: Arc<PerpClient>,
        price_oracle: Arc<PriceOracle>,
        thresholds: ThresholdConfig,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsEngine>,
    ) -> Self {
        Self { pool, client, price_oracle, thresholds, sink, metrics, tracked: Arc::new(DashMap::new()) }
    }

    pub fn track(&self, whale_id: Uuid, address: String) {
        self.tracked.insert(whale_id, address);
    }

    fn fill_direction(fill: &Fill) -> Option<TradeDirection> {
        match fill.dir.as_str() {
            "Open Long" => Some(TradeDirection::Long),
            "Open Short" => Some(TradeDirection::Short),
            "Close Long" => Some(TradeDirection::CloseLong),
            "Close Short" => Some(TradeDirection::CloseShort),
            _ => None,
        }
    }

    /// Runs one fetch-normalize-persist pass for a single whale. Public so
    /// the Backfill Orchestrator can drive it directly for one whale at a
    /// time, unbounded by the `tracked` set a regular tick iterates.
    pub async fn tick_one(&self, whale_id: Uuid, address: &str) -> Result<TickReport> {
        let checkpoints = CheckpointRepository::new(self.pool.clone());
        let whales = WhaleRepository::new(self.pool.clone());
        let trades = TradeRepository::new(self.pool.clone());
        let events = EventRepository::new(self.pool.clone());
        let holdings = HoldingRepository::new(self.pool.clone());

        let checkpoint = checkpoints.get(whale_id, Chain::Perp).await?;
        let since_millis = checkpoint.as_ref().and_then(|c| c.last_timestamp).map(|t| t.timestamp_millis()).unwrap_or(0);

        let mut report = TickReport { whales_processed: 1, ..Default::default() };

        let fills = self.client.user_fills_since(address, since_millis).await?;
        let mut new_trades = Vec::new();

        for fill in &fills {
            let Some(direction) = Self::fill_direction(fill) else {
                report.decode_errors += 1;
                continue;
            };
            let Ok(price) = Decimal::from_str(&fill.px) else {
                report.decode_errors += 1;
                continue;
            };
            let Ok(size) = Decimal::from_str(&fill.sz) else {
                report.decode_errors += 1;
                continue;
            };
            // Close fills store a negative size; open fills a positive one.
            let signed_size = if direction.is_closing() { -size.abs() } else { size.abs() };
            let usd_notional = Some(size.abs() * price);
            let realized_pnl_usd =
                fill.closed_pnl.as_ref().and_then(|p| Decimal::from_str(p).ok()).filter(|_| direction.is_closing());
            let timestamp = Utc.timestamp_millis_opt(fill.time).single().unwrap_or_else(Utc::now);

            new_trades.push(NewTrade {
                whale_id,
                timestamp,
                source: TradeSource::Perp,
                platform: "perp".to_string(),
                direction,
                base_asset: fill.coin.clone(),
                quote_asset: Some("USD".to_string()),
                base_amount: signed_size,
                quote_amount: price * size.abs(),
                usd_notional,
                realized_pnl_usd,
                realized_pnl_percent: None,
                open_price: (!direction.is_closing()).then_some(price),
                close_price: direction.is_closing().then_some(price),
                tx_hash: Some(fill.hash.clone()),
                catalog_version: None,
            });
        }

        new_trades.sort_by_key(|t| t.timestamp);

        if !new_trades.is_empty() {
            let mut tx = self.pool.begin().await?;
            for trade in &new_trades {
                match trades.upsert_in_tx(&mut tx, trade).await {
                    Ok(_) => report.trades_persisted += 1,
                    Err(Error::Database(_)) => report.decode_errors += 1,
                    Err(e) => return Err(e),
                }
            }

            let new_checkpoint = IngestionCheckpoint {
                whale_id,
                chain: Chain::Perp,
                last_timestamp: new_trades.last().map(|t| t.timestamp),
                last_block_height: None,
                last_position_snapshot_at: Some(Utc::now()),
                continuation_token: None,
                updated_at: Utc::now(),
            };
            checkpoints.advance_in_tx(&mut tx, &new_checkpoint).await?;
            tx.commit().await?;

            whales.touch_last_active(whale_id).await?;
            self.metrics.incremental_update(whale_id).await?;

            for trade in &new_trades {
                let Some(usd) = trade.usd_notional else { continue };
                if usd >= self.thresholds.for_type(EventType::PerpTrade) {
                    let event = events
                        .insert(&NewEvent {
                            whale_id,
                            timestamp: trade.timestamp,
                            event_type: EventType::PerpTrade,
                            summary: format!("{:?} {} {}", trade.direction, trade.base_amount.abs(), trade.base_asset),
                            value_usd: usd,
                            tx_hash: trade.tx_hash.clone(),
                            details: serde_json::json!({ "asset": trade.base_asset }),
                        })
                        .await?;
                    self.sink.publish(event).await;
                    report.events_emitted += 1;
                }
            }
        }

        // Position snapshots are the source of truth for current holdings
        // and are always replaced wholesale, independent of whether any
        // fills were seen this tick.
        let state = self.client.clearinghouse_state(address).await?;
        let mut new_holdings = Vec::new();
        for asset_position in &state.asset_positions {
            let Ok(size) = Decimal::from_str(&asset_position.position.szi) else {
                report.decode_errors += 1;
                continue;
            };
            if size == Decimal::ZERO {
                continue;
            }
            let usd_value = Decimal::from_str(&asset_position.position.position_value).ok();
            new_holdings.push(NewHolding {
                asset: asset_position.position.coin.clone(),
                chain: Chain::Perp,
                amount: size,
                usd_value,
            });
        }
        holdings.replace(whale_id, new_holdings).await?;

        Ok(report)
    }
}

#[async_trait]
impl Collector for PerpCollector {
    fn chain(&self) -> Chain {
        Chain::Perp
    }

    async fn tick(&self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let targets: Vec<(Uuid, String)> = self.tracked.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (whale_id, address) in targets {
            match self.tick_one(whale_id, &address).await {
                Ok(r) => report.merge(r),
                Err(Error::UpstreamUnavailable(_)) | Err(Error::RateLimited(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_long_direction_maps() {
        let fill = Fill {
            coin: "ETH".to_string(),
            px: "3000".to_string(),
            sz: "1".to_string(),
            dir: "Open Long".to_string(),
            time: 0,
            hash: "0xabc".to_string(),
            closed_pnl: None,
        };
        assert_eq!(PerpCollector::fill_direction(&fill), Some(TradeDirection::Long));
    }

    #[test]
    fn unknown_direction_is_none() {
        let fill = Fill {
            coin: "ETH".to_string(),
            px: "3000".to_string(),
            sz: "1".to_string(),
            dir: "Liquidation".to_string(),
            time: 0,
            hash: "0xabc".to_string(),
            closed_pnl: None,
        };
        assert_eq!(PerpCollector::fill_direction(&fill), None);
    }
}
