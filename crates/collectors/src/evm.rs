//! EVM collector: maintains a last-processed block height per wallet,
//! filters by log topics for relevant transfers and known router contracts,
//! decodes swap logs into base/quote/direction, and classifies
//! counterparties via the exchange address catalog.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use metrics_engine::MetricsEngine;
use price_oracle::PriceOracle;
use whale_core::db::{checkpoints::CheckpointRepository, events::EventRepository, trades::TradeRepository, whales::WhaleRepository};
use whale_core::sink::EventSink;
use whale_core::types::{Chain, EventType, IngestionCheckpoint, NewEvent, NewTrade, TradeDirection, TradeSource};
use whale_core::{config::ThresholdConfig, Error, Result};

use crate::catalog::{AddressLabel, ExchangeAddressCatalog};
use crate::collector::{Collector, TickReport};
use crate::rpc::EvmRpcClient;

/// Transfer(address,address,uint256) topic0.
const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub struct EvmCollector {
    pool: PgPool,
    rpc: Arc<EvmRpcClient>,
    price_oracle: Arc<PriceOracle>,
    catalog: Arc<ExchangeAddressCatalog>,
    thresholds: ThresholdConfig,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsEngine>,
    /// Tracked whale addresses for this chain, loaded at construction time
    /// and refreshed by the caller when whales are added.
    tracked: Arc<DashMap<Uuid, String>>,
}

impl EvmCollector {
    pub fn new(
        pool: PgPool,
        rpc: Arc<EvmRpcClient>,
        price_oracle: Arc<PriceOracle>,
        catalog: Arc<ExchangeAddressCatalog>,
        thresholds: ThresholdConfig,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsEngine>,
    ) -> Self {
        Self { pool, rpc, price_oracle, catalog, thresholds, sink, metrics, tracked: Arc::new(DashMap::new()) }
    }

    pub fn track(&self, whale_id: Uuid, address: String) {
        self.tracked.insert(whale_id, address);
    }

    /// Runs one fetch-normalize-persist pass for a single whale. Public so
    /// the Backfill Orchestrator can drive it directly for one whale at a
    /// time, unbounded by the `tracked` set a regular tick iterates.
    pub async fn tick_one(&self, whale_id: Uuid, address: &str) -> Result<TickReport> {
        let checkpoints = CheckpointRepository::new(self.pool.clone());
        let whales = WhaleRepository::new(self.pool.clone());
        let trades = TradeRepository::new(self.pool.clone());
        let events = EventRepository::new(self.pool.clone());

        let checkpoint = checkpoints.get(whale_id, Chain::Evm).await?;
        let from_block = checkpoint.as_ref().and_then(|c| c.last_block_height).unwrap_or(0) as u64 + 1;
        let to_block = self.rpc.get_block_number().await?;

        if to_block < from_block {
            return Ok(TickReport { whales_processed: 1, ..Default::default() });
        }

        let logs = self.rpc.get_logs(address, &[TRANSFER_TOPIC], from_block, to_block).await?;

        let mut report = TickReport { whales_processed: 1, ..Default::default() };
        let mut new_trades = Vec::new();
        let mut max_block = from_block.saturating_sub(1);

        for log in logs {
            let block_number = match u64::from_str_radix(log.block_number.trim_start_matches("0x"), 16) {
                Ok(n) => n,
                Err(_) => {
                    report.decode_errors += 1;
                    continue;
                }
            };
            max_block = max_block.max(block_number);

            let amount = match decode_transfer_amount(&log.data) {
                Some(a) => a,
                None => {
                    report.decode_errors += 1;
                    continue;
                }
            };

            let direction = match self.catalog.classify(&log.address) {
                Some(AddressLabel::ExchangeDeposit) => TradeDirection::Deposit,
                Some(AddressLabel::ExchangeWithdrawal) => TradeDirection::Withdraw,
                Some(AddressLabel::DexRouter) | Some(AddressLabel::Bridge) => TradeDirection::Buy,
                None => TradeDirection::Buy,
            };

            let usd_notional = self.price_oracle.spot("ETH").await.ok().flatten().map(|p| p * amount);

            new_trades.push(NewTrade {
                whale_id,
                timestamp: Utc::now(),
                source: TradeSource::Onchain,
                platform: "evm".to_string(),
                direction,
                base_asset: "ETH".to_string(),
                quote_asset: None,
                base_amount: amount,
                quote_amount: Decimal::ZERO,
                usd_notional,
                realized_pnl_usd: None,
                realized_pnl_percent: None,
                open_price: None,
                close_price: None,
                tx_hash: Some(log.transaction_hash),
                catalog_version: Some(self.catalog.version()),
            });
        }

        // Sort oldest -> newest so cost-basis and checkpoint advances stay
        // monotonic downstream.
        new_trades.sort_by_key(|t| t.timestamp);

        if new_trades.is_empty() {
            return Ok(report);
        }

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
            chain: Chain::Evm,
            last_timestamp: new_trades.last().map(|t| t.timestamp),
            last_block_height: Some(max_block as i64),
            last_position_snapshot_at: None,
            continuation_token: None,
            updated_at: Utc::now(),
        };
        checkpoints.advance_in_tx(&mut tx, &new_checkpoint).await?;
        tx.commit().await?;

        whales.touch_last_active(whale_id).await?;
        self.metrics.incremental_update(whale_id).await?;

        for trade in &new_trades {
            if let Some(usd) = trade.usd_notional {
                let event_type = EventType::LargeSwap;
                if usd >= self.thresholds.for_type(event_type) {
                    let event = events
                        .insert(&NewEvent {
                            whale_id,
                            timestamp: trade.timestamp,
                            event_type,
                            summary: format!("large swap of {} {}", trade.base_amount, trade.base_asset),
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

        Ok(report)
    }
}

#[async_trait]
impl Collector for EvmCollector {
    fn chain(&self) -> Chain {
        Chain::Evm
    }

    async fn tick(&self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let targets: Vec<(Uuid, String)> = self.tracked.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (whale_id, address) in targets {
            match self.tick_one(whale_id, &address).await {
                Ok(r) => report.merge(r),
                Err(Error::UpstreamUnavailable(_)) | Err(Error::RateLimited(_)) => {
                    // Logged by the caller; tick ends for this whale without
                    // advancing its checkpoint so the next tick retries.
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

/// Decodes the `uint256` value field of an ERC-20 Transfer log into a
/// human-scaled (18-decimal) amount.
fn decode_transfer_amount(data: &str) -> Option<Decimal> {
    let hex = data.trim_start_matches("0x");
    if hex.is_empty() {
        return None;
    }
    let raw = u128::from_str_radix(&hex[hex.len().saturating_sub(32)..], 16).ok()?;
    let scaled = Decimal::from_str(&raw.to_string()).ok()? / Decimal::from(10u64.pow(18));
    Some(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_transfer_amount() {
        // 1 token with 18 decimals = 0xDE0B6B3A7640000
        let data = "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000";
        let amount = decode_transfer_amount(data).unwrap();
        assert_eq!(amount, Decimal::from_str("1").unwrap());
    }

    #[test]
    fn empty_data_decodes_to_none() {
        assert!(decode_transfer_amount("0x").is_none());
    }
}
