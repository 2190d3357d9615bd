//! Metrics Engine
//!
//! Rebuilds `WalletMetricsDaily` snapshots from a whale's trade history by
//! replaying every trade through a shared FIFO cost-basis accountant and
//! pricing open positions at each day boundary via the Price Oracle.
//!
//! Both [`MetricsEngine::full_rebuild`] and [`MetricsEngine::incremental_update`]
//! drive the same [`accounting::Accountant`] so the two paths can never
//! disagree on a number — the only difference is how far back they replay
//! and whether the repository deletes the existing range first.

pub mod accounting;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use accounting::Accountant;
use price_oracle::PriceOracle;
use whale_core::db::metrics::MetricsRepository;
use whale_core::db::trades::TradeRepository;
use whale_core::types::{Trade, WalletMetricsDaily};
use whale_core::Result;

/// Drives cost-basis rebuilds for every tracked whale, serializing at most
/// one rebuild per whale at a time and coalescing concurrent requests into
/// a single extra pass rather than a queue of redundant rebuilds.
pub struct MetricsEngine {
    pool: PgPool,
    price_oracle: Arc<PriceOracle>,
    running: DashMap<Uuid, Arc<Mutex<()>>>,
    pending: DashMap<Uuid, Arc<AtomicBool>>,
}

impl MetricsEngine {
    pub fn new(pool: PgPool, price_oracle: Arc<PriceOracle>) -> Self {
        Self { pool, price_oracle, running: DashMap::new(), pending: DashMap::new() }
    }

    /// Deletes and replaces the whale's entire `wallet_metrics_daily`
    /// range. Coalesces concurrent callers: if a rebuild is already
    /// running for this whale, this call just flags a pending re-run and
    /// returns immediately rather than queuing a second full replay.
    pub async fn full_rebuild(&self, whale_id: Uuid) -> Result<()> {
        let lock = self.lock_for(whale_id);
        let pending = self.pending_for(whale_id);

        let Ok(_guard) = lock.try_lock() else {
            pending.store(true, Ordering::SeqCst);
            return Ok(());
        };

        loop {
            self.rebuild_once(whale_id, None).await?;
            if !pending.swap(false, Ordering::SeqCst) {
                break;
            }
        }
        Ok(())
    }

    /// Appends rows for dates at or after the latest persisted date (or
    /// replays the whole history if none exists yet). Never deletes.
    pub async fn incremental_update(&self, whale_id: Uuid) -> Result<()> {
        let lock = self.lock_for(whale_id);
        let pending = self.pending_for(whale_id);

        let Ok(_guard) = lock.try_lock() else {
            pending.store(true, Ordering::SeqCst);
            return Ok(());
        };

        let metrics = MetricsRepository::new(self.pool.clone());
        loop {
            let since = metrics.latest_date(whale_id).await?;
            self.rebuild_once(whale_id, since).await?;
            if !pending.swap(false, Ordering::SeqCst) {
                break;
            }
        }
        Ok(())
    }

    /// Rebuilds ROI/portfolio history on demand when the query range has
    /// no stored rows yet, rather than leaving callers with an empty
    /// series for a whale that has never been rebuilt.
    pub async fn ensure_rebuilt(&self, whale_id: Uuid) -> Result<()> {
        let metrics = MetricsRepository::new(self.pool.clone());
        if metrics.latest_date(whale_id).await?.is_none() {
            self.full_rebuild(whale_id).await?;
        }
        Ok(())
    }

    fn lock_for(&self, whale_id: Uuid) -> Arc<Mutex<()>> {
        self.running.entry(whale_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn pending_for(&self, whale_id: Uuid) -> Arc<AtomicBool> {
        self.pending.entry(whale_id).or_insert_with(|| Arc::new(AtomicBool::new(false))).clone()
    }

    /// Loads trades, replays them day by day from `since` (exclusive; the
    /// whole history when `None`) through today, and persists the result.
    /// `since` being `Some` drives an incremental append; `None` drives a
    /// full delete-and-replace.
    async fn rebuild_once(&self, whale_id: Uuid, since: Option<NaiveDate>) -> Result<()> {
        let trades_repo = TradeRepository::new(self.pool.clone());
        let metrics_repo = MetricsRepository::new(self.pool.clone());

        let trades = trades_repo.all_ordered(whale_id).await?;
        if trades.is_empty() {
            return Ok(());
        }

        let rows = build_daily_snapshots(whale_id, &trades, &self.price_oracle).await?;
        let rows: Vec<WalletMetricsDaily> = match since {
            Some(cutoff) => rows.into_iter().filter(|r| r.date >= cutoff).collect(),
            None => rows,
        };

        if rows.is_empty() {
            return Ok(());
        }

        match since {
            Some(_) => metrics_repo.append_incremental(whale_id, &rows).await,
            None => metrics_repo.replace_range(whale_id, &rows).await,
        }
    }
}

/// Replays `trades` (already ordered oldest to newest) through one
/// [`Accountant`], snapshotting a `WalletMetricsDaily` row at every day
/// boundary from the first trade's date through today.
async fn build_daily_snapshots(
    whale_id: Uuid,
    trades: &[Trade],
    price_oracle: &PriceOracle,
) -> Result<Vec<WalletMetricsDaily>> {
    let mut accountant = Accountant::new();
    let mut rows = Vec::new();

    let first_date = trades[0].timestamp.date_naive();
    let today = Utc::now().date_naive();

    let mut idx = 0usize;
    let mut day_volume = Decimal::ZERO;
    let mut day_trades: i64 = 0;

    let mut date = first_date;
    while date <= today {
        while idx < trades.len() && trades[idx].timestamp.date_naive() == date {
            let outcome = accountant.apply(&trades[idx]);
            if let Some(v) = outcome.volume_usd {
                day_volume += v;
            }
            day_trades += 1;
            idx += 1;
        }

        let day_end = date
            .and_hms_opt(23, 59, 59)
            .expect("valid time")
            .and_utc()
            .min(Utc::now());

        let mut prices: HashMap<String, Option<Decimal>> = HashMap::new();
        for asset in accountant.open_assets() {
            if !prices.contains_key(&asset) {
                let price = price_oracle.historical(&asset, day_end).await?;
                prices.insert(asset, price);
            }
        }

        let (portfolio_value, cost_basis) =
            accountant.open_position_value(|asset| prices.get(asset).copied().flatten());
        let unrealized = portfolio_value - cost_basis;
        let roi = accountant.roi_percent(portfolio_value);

        rows.push(WalletMetricsDaily {
            whale_id,
            date,
            portfolio_value_usd: portfolio_value,
            roi_percent: roi,
            realized_pnl_usd: accountant.realized_pnl_total_usd,
            unrealized_pnl_usd: unrealized,
            volume_1d_usd: day_volume,
            trades_1d: day_trades,
            win_rate_percent: accountant.win_rate_percent(),
        });

        day_volume = Decimal::ZERO;
        day_trades = 0;
        date += ChronoDuration::days(1);
    }

    Ok(rows)
}

/// Helper used by callers that already hold a `DateTime<Utc>` range (the
/// broadcaster and backfill orchestrator trigger rebuilds by whale id
/// only; this exists for API-server handlers that want a point-in-time
/// ROI without waiting on a full day loop).
pub async fn roi_as_of(
    price_oracle: &PriceOracle,
    trades: &[Trade],
    at: DateTime<Utc>,
) -> Result<Decimal> {
    let mut accountant = Accountant::new();
    for trade in trades.iter().take_while(|t| t.timestamp <= at) {
        accountant.apply(trade);
    }
    let mut prices = HashMap::new();
    for asset in accountant.open_assets() {
        let price = price_oracle.historical(&asset, at).await?;
        prices.insert(asset, price);
    }
    let (value, _cost) = accountant.open_position_value(|asset| prices.get(asset).copied().flatten());
    Ok(accountant.roi_percent(value))
}
