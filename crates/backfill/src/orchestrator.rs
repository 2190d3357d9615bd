//! Backfill Orchestrator
//!
//! Drives the same collector used by a regular tick, but for one whale at
//! a time and unbounded by recency — a tick with an empty checkpoint
//! already fetches the whale's entire available history, so backfill is
//! just that tick run to exhaustion with a tracked state machine and a
//! progress estimate on top.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::time::Instant;

use collectors::{EvmCollector, PerpCollector, UtxoCollector};
use dashmap::DashMap;
use metrics_engine::MetricsEngine;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use whale_core::db::{backfill::BackfillRepository, whales::WhaleRepository};
use whale_core::types::{BackfillState, BackfillStatus, Chain};
use whale_core::{Error, Result};

/// Progress ramps toward this ceiling on a time basis when the collector
/// gives no total-item count to derive an exact fraction from, then jumps
/// to 100 on completion.
const TIME_RAMP_CEILING: i16 = 90;
/// Seconds to reach the ramp ceiling — tuned so a whale with a typical
/// history finishes near 90% rather than pegging at it for minutes.
const TIME_RAMP_SECONDS: f64 = 60.0;
/// A tick that persists no new trades two times in a row means the
/// source has nothing strictly newer than the checkpoint left to give.
const EXHAUSTION_STREAK: u32 = 2;
/// Safety cap on ticks per backfill run.
const MAX_TICKS: u32 = 500;

pub struct BackfillOrchestrator {
    pool: PgPool,
    evm: Arc<EvmCollector>,
    utxo: Arc<UtxoCollector>,
    perp: Arc<PerpCollector>,
    metrics: Arc<MetricsEngine>,
    running: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl BackfillOrchestrator {
    pub fn new(
        pool: PgPool,
        evm: Arc<EvmCollector>,
        utxo: Arc<UtxoCollector>,
        perp: Arc<PerpCollector>,
        metrics: Arc<MetricsEngine>,
    ) -> Self {
        Self { pool, evm, utxo, perp, metrics, running: DashMap::new() }
    }

    pub async fn get_status(&self, whale_id: Uuid) -> Result<BackfillStatus> {
        BackfillRepository::new(self.pool.clone()).get(whale_id).await
    }

    /// A second request while a job is already running for this whale is
    /// a no-op that returns the current status rather than queuing.
    pub async fn start_backfill(&self, whale_id: Uuid) -> Result<BackfillStatus> {
        let repo = BackfillRepository::new(self.pool.clone());
        let current = repo.get(whale_id).await?;
        if current.state == BackfillState::Running {
            return Ok(current);
        }

        let lock = self.running.entry(whale_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        let Ok(guard) = lock.try_lock_owned() else {
            return Ok(current);
        };

        let status = repo.transition(whale_id, BackfillState::Running, 0, None).await?;

        let pool = self.pool.clone();
        let evm = self.evm.clone();
        let utxo = self.utxo.clone();
        let perp = self.perp.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let _guard = guard;
            run_backfill(pool, evm, utxo, perp, metrics, whale_id).await;
        });

        Ok(status)
    }

    /// Perp-only: wipes the whale's trades/events/holdings/metrics and
    /// checkpoint, then starts a fresh backfill.
    pub async fn start_reset(&self, whale_id: Uuid) -> Result<BackfillStatus> {
        let whales = WhaleRepository::new(self.pool.clone());
        let whale = whales.get(whale_id).await?.ok_or_else(|| Error::NotFound(format!("whale {whale_id}")))?;
        if whale.chain != Chain::Perp {
            return Err(Error::Invariant("reset is only supported for perp whales".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM trades WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM events WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM holdings WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM wallet_metrics_daily WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM current_wallet_metrics WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM ingestion_checkpoints WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        tx.commit().await?;

        self.start_backfill(whale_id).await
    }
}

async fn run_backfill(
    pool: PgPool,
    evm: Arc<EvmCollector>,
    utxo: Arc<UtxoCollector>,
    perp: Arc<PerpCollector>,
    metrics: Arc<MetricsEngine>,
    whale_id: Uuid,
) {
    let repo = BackfillRepository::new(pool.clone());
    let whales = WhaleRepository::new(pool.clone());

    let result = async {
        let whale = whales.get(whale_id).await?.ok_or_else(|| Error::NotFound(format!("whale {whale_id}")))?;
        let started = Instant::now();
        let mut empty_streak = 0u32;
        let progress = AtomicU8::new(0);

        for tick in 0..MAX_TICKS {
            let report = match whale.chain {
                Chain::Evm => evm.tick_one(whale_id, &whale.address).await?,
                Chain::Utxo => utxo.tick_one(whale_id, &whale.address).await?,
                Chain::Perp => perp.tick_one(whale_id, &whale.address).await?,
            };

            if report.trades_persisted == 0 {
                empty_streak += 1;
            } else {
                empty_streak = 0;
            }

            let elapsed = started.elapsed().as_secs_f64();
            let ramped = ((elapsed / TIME_RAMP_SECONDS) * TIME_RAMP_CEILING as f64).min(TIME_RAMP_CEILING as f64) as i16;
            progress.store(ramped.max(0).min(100) as u8, std::sync::atomic::Ordering::Relaxed);
            repo.transition(whale_id, BackfillState::Running, ramped, None).await?;

            if empty_streak >= EXHAUSTION_STREAK {
                info!(whale_id = %whale_id, tick, "backfill exhausted source history");
                break;
            }
        }

        metrics.full_rebuild(whale_id).await?;
        Ok::<(), Error>(())
    }
    .await;

    match result {
        Ok(()) => {
            if let Err(e) = repo.transition(whale_id, BackfillState::Done, 100, None).await {
                error!(whale_id = %whale_id, error = %e, "failed to record backfill completion");
            }
        }
        Err(e) => {
            warn!(whale_id = %whale_id, error = %e, "backfill failed");
            if let Err(e) = repo.transition(whale_id, BackfillState::Error, 0, Some(e.to_string())).await {
                error!(whale_id = %whale_id, error = %e, "failed to record backfill failure");
            }
        }
    }
}
