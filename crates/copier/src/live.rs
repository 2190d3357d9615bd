//! Live copy-trading session runner.
//!
//! Polls a whale's trade store for records newer than the session's
//! last-seen marker and applies the backtest's sizing/cost model against an
//! in-memory equity tracker seeded from the backing run's initial deposit.
//! `execute=true` (real order submission) is out of scope for this system —
//! sessions only ever update their own bookkeeping and notification log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use whale_core::db::copier::CopierRepository;
use whale_core::db::trades::TradeRepository;
use whale_core::types::{CopierSession, CopierSessionState, TradeDirection};
use whale_core::{Error, Result};

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

struct LivePosition {
    quantity: Decimal,
    entry_price: Decimal,
    is_short: bool,
}

/// Tracks the stop flag for every session this process has spawned a loop
/// for, so `stop_session` can signal a running task without waiting on it.
pub struct LiveCopier {
    pool: PgPool,
    stop_flags: DashMap<Uuid, Arc<AtomicBool>>,
}

impl LiveCopier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, stop_flags: DashMap::new() }
    }

    pub async fn start_session(self: &Arc<Self>, whale_id: Uuid, run_id: Uuid, position_pct_override: Decimal) -> Result<CopierSession> {
        let repo = CopierRepository::new(self.pool.clone());
        let session = repo.create_session(whale_id, run_id).await?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flags.insert(session.id, stop_flag.clone());

        let this = self.clone();
        let session_id = session.id;
        tokio::spawn(async move {
            if let Err(e) = this.run_loop(session_id, position_pct_override, stop_flag).await {
                warn!(session_id = %session_id, error = %e, "live copier session ended with error");
            }
        });

        Ok(session)
    }

    pub async fn stop_session(&self, session_id: Uuid) -> Result<()> {
        if let Some(flag) = self.stop_flags.get(&session_id) {
            flag.store(true, Ordering::Relaxed);
        }
        let repo = CopierRepository::new(self.pool.clone());
        let mut session = repo.get_session(session_id).await?.ok_or_else(|| Error::NotFound(format!("copier session {session_id}")))?;
        session.state = CopierSessionState::Stopped;
        repo.update_session(&session).await
    }

    pub async fn list_active(&self, whale_id: Uuid) -> Result<Vec<CopierSession>> {
        CopierRepository::new(self.pool.clone()).list_active(whale_id).await
    }

    async fn run_loop(&self, session_id: Uuid, position_pct_override: Decimal, stop_flag: Arc<AtomicBool>) -> Result<()> {
        let copier_repo = CopierRepository::new(self.pool.clone());
        let trades_repo = TradeRepository::new(self.pool.clone());

        let mut session = copier_repo.get_session(session_id).await?.ok_or_else(|| Error::NotFound(format!("copier session {session_id}")))?;
        let run = copier_repo.get_run(session.run_id).await?.ok_or_else(|| Error::NotFound(format!("backtest run {}", session.run_id)))?;

        let mut equity = run.params.initial_deposit;
        let mut positions: HashMap<String, LivePosition> = HashMap::new();
        let fee_rate = run.params.fee_bps / Decimal::from(10_000);
        let slippage_rate = run.params.slippage_bps / Decimal::from(10_000);

        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if stop_flag.load(Ordering::Relaxed) || session.state != CopierSessionState::Active {
                break;
            }

            let all_trades = trades_repo.all_ordered(session.whale_id).await?;
            let since = session.last_seen_trade_at;
            let new_trades: Vec<_> = all_trades.into_iter().filter(|t| since.map_or(true, |s| t.timestamp > s)).collect();

            for trade in &new_trades {
                self.apply_trade(
                    trade,
                    &mut equity,
                    &mut positions,
                    position_pct_override,
                    run.params.leverage,
                    fee_rate,
                    slippage_rate,
                    &mut session,
                );
                session.processed_trades += 1;
                session.last_seen_trade_at = Some(trade.timestamp);
            }

            if !new_trades.is_empty() {
                copier_repo.update_session(&session).await?;
            }
        }

        info!(session_id = %session_id, "live copier session stopped");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_trade(
        &self,
        trade: &whale_core::types::Trade,
        equity: &mut Decimal,
        positions: &mut HashMap<String, LivePosition>,
        position_pct: Decimal,
        leverage: Decimal,
        fee_rate: Decimal,
        slippage_rate: Decimal,
        session: &mut CopierSession,
    ) {
        let raw_price = trade
            .open_price
            .or(trade.close_price)
            .or_else(|| if trade.base_amount.is_zero() { None } else { trade.usd_notional.map(|n| n / trade.base_amount.abs()) });
        let Some(raw_price) = raw_price else { return };

        if trade.direction.is_opening() {
            let is_short = matches!(trade.direction, TradeDirection::Short);
            let notional = *equity * position_pct * leverage;
            if notional > *equity {
                session.push_notification(format!("sized down: insufficient equity for {} at {}", trade.base_asset, trade.timestamp));
            }
            let capped_notional = notional.min(*equity);
            let slippage = raw_price * slippage_rate;
            let execution_price = if is_short { raw_price - slippage } else { raw_price + slippage };
            let fee = capped_notional * fee_rate;
            let quantity = if execution_price > Decimal::ZERO { capped_notional / execution_price } else { Decimal::ZERO };

            *equity -= fee;
            positions.insert(trade.base_asset.clone(), LivePosition { quantity, entry_price: execution_price, is_short });
        } else if trade.direction.is_closing() {
            if let Some(pos) = positions.remove(&trade.base_asset) {
                let slippage = raw_price * slippage_rate;
                let execution_price = if pos.is_short { raw_price + slippage } else { raw_price - slippage };
                let proceeds = pos.quantity * execution_price;
                let fee = proceeds * fee_rate;
                let pnl = if pos.is_short {
                    (pos.entry_price - execution_price) * pos.quantity - fee
                } else {
                    (execution_price - pos.entry_price) * pos.quantity - fee
                };
                *equity += pnl;
                session.push_notification(format!("closed {} realized_pnl={}", trade.base_asset, pnl));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_ring_buffer_caps_under_heavy_trading() {
        let mut session = CopierSession {
            id: Uuid::new_v4(),
            whale_id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            state: CopierSessionState::Active,
            processed_trades: 0,
            last_seen_trade_at: None::<DateTime<Utc>>,
            notifications: vec![],
            errors: vec![],
            created_at: Utc::now(),
        };
        for i in 0..200 {
            session.push_notification(format!("n{i}"));
        }
        assert_eq!(session.notifications.len(), CopierSession::MAX_NOTIFICATIONS);
    }
}
