//! UTXO collector: paginates address history via an Esplora-compatible
//! API using the opaque `last_tx_id` cursor, classifies each transaction's
//! net effect on a tracked address as inflow/outflow, and detects
//! exchange flow by matching counterpart addresses against the catalog.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::PgPool;
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
use crate::esplora::EsploraClient;

/// Esplora page size; a page shorter than this means history is exhausted.
const PAGE_SIZE: usize = 25;
/// Safety cap on pages fetched per tick so one very active address cannot
/// starve the other tracked whales out of a tick.
const MAX_PAGES_PER_TICK: usize = 40;

pub struct UtxoCollector {
    pool: PgPool,
    esplora: Arc<EsploraClient>,
    price_oracle: Arc<PriceOracle>,
    catalog: Arc<ExchangeAddressCatalog>,
    thresholds: ThresholdConfig,
    sink: Arc<dyn EventSink>,
    metrics: Arc<MetricsEngine>,
    tracked: Arc<DashMap<Uuid, String>>,
}

impl UtxoCollector {
    pub fn new(
        pool: PgPool,
        esplora: Arc<EsploraClient>,
        price_oracle: Arc<PriceOracle>,
        catalog: Arc<ExchangeAddressCatalog>,
        thresholds: ThresholdConfig,
        sink: Arc<dyn EventSink>,
        metrics: Arc<MetricsEngine>,
    ) -> Self {
        Self { pool, esplora, price_oracle, catalog, thresholds, sink, metrics, tracked: Arc::new(DashMap::new()) }
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

        let checkpoint = checkpoints.get(whale_id, Chain::Utxo).await?;
        let mut cursor = checkpoint.as_ref().and_then(|c| c.continuation_token.clone());

        let mut report = TickReport { whales_processed: 1, ..Default::default() };
        let mut new_trades = Vec::new();
        let mut last_txid = cursor.clone();

        for _ in 0..MAX_PAGES_PER_TICK {
            let page = self.esplora.address_txs(address, cursor.as_deref()).await?;
            if page.is_empty() {
                break;
            }

            for tx in &page {
                let received: i64 = tx
                    .vout
                    .iter()
                    .filter(|o| o.scriptpubkey_address.as_deref() == Some(address))
                    .map(|o| o.value as i64)
                    .sum();
                let sent: i64 = tx
                    .vin
                    .iter()
                    .filter_map(|i| i.prevout.as_ref())
                    .filter(|p| p.scriptpubkey_address.as_deref() == Some(address))
                    .map(|p| p.value as i64)
                    .sum();
                let net = received - sent;
                last_txid = Some(tx.txid.clone());

                if net == 0 {
                    continue;
                }

                let mut counterparty_label = None;
                for candidate in tx
                    .vin
                    .iter()
                    .filter_map(|i| i.prevout.as_ref().and_then(|p| p.scriptpubkey_address.as_deref()))
                    .chain(tx.vout.iter().filter_map(|o| o.scriptpubkey_address.as_deref()))
                    .filter(|a| *a != address)
                {
                    if let Some(label) = self.catalog.classify(candidate) {
                        counterparty_label = Some(label);
                        break;
                    }
                }

                let direction = match (net > 0, counterparty_label) {
                    (_, Some(AddressLabel::ExchangeDeposit) | Some(AddressLabel::ExchangeWithdrawal)) => {
                        if net > 0 {
                            TradeDirection::Deposit
                        } else {
                            TradeDirection::Withdraw
                        }
                    }
                    (true, _) => TradeDirection::Buy,
                    (false, _) => TradeDirection::Sell,
                };

                let amount = Decimal::from(net.abs()) / Decimal::from(100_000_000u64);
                let usd_notional = self.price_oracle.spot("BTC").await.ok().flatten().map(|p| p * amount);
                let timestamp = tx
                    .status
                    .block_time
                    .and_then(|t| Utc.timestamp_opt(t, 0).single())
                    .unwrap_or_else(Utc::now);

                new_trades.push(NewTrade {
                    whale_id,
                    timestamp,
                    source: TradeSource::Onchain,
                    platform: "utxo".to_string(),
                    direction,
                    base_asset: "BTC".to_string(),
                    quote_asset: None,
                    base_amount: amount,
                    quote_amount: Decimal::ZERO,
                    usd_notional,
                    realized_pnl_usd: None,
                    realized_pnl_percent: None,
                    open_price: None,
                    close_price: None,
                    tx_hash: Some(tx.txid.clone()),
                    catalog_version: Some(self.catalog.version()),
                });
            }

            if page.len() < PAGE_SIZE {
                break;
            }
            cursor = last_txid.clone();
        }

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
            chain: Chain::Utxo,
            last_timestamp: new_trades.last().map(|t| t.timestamp),
            last_block_height: None,
            last_position_snapshot_at: None,
            continuation_token: last_txid,
            updated_at: Utc::now(),
        };
        checkpoints.advance_in_tx(&mut tx, &new_checkpoint).await?;
        tx.commit().await?;

        whales.touch_last_active(whale_id).await?;
        self.metrics.incremental_update(whale_id).await?;

        for trade in &new_trades {
            let Some(usd) = trade.usd_notional else { continue };
            let event_type =
                if matches!(trade.direction, TradeDirection::Deposit | TradeDirection::Withdraw) {
                    EventType::ExchangeFlow
                } else {
                    EventType::LargeTransfer
                };
            if usd >= self.thresholds.for_type(event_type) {
                let event = events
                    .insert(&NewEvent {
                        whale_id,
                        timestamp: trade.timestamp,
                        event_type,
                        summary: format!("{:?} of {} BTC", trade.direction, trade.base_amount),
                        value_usd: usd,
                        tx_hash: trade.tx_hash.clone(),
                        details: serde_json::json!({ "asset": trade.base_asset }),
                    })
                    .await?;
                self.sink.publish(event).await;
                report.events_emitted += 1;
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl Collector for UtxoCollector {
    fn chain(&self) -> Chain {
        Chain::Utxo
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
