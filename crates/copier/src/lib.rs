//! Copier Simulator
//!
//! Backtests a whale's historical trades through a cost model and runs
//! shadow-only live copy sessions against new trades as they arrive.

pub mod backtest;
pub mod live;

use std::sync::Arc;

use sqlx::PgPool;

use price_oracle::PriceOracle;
use whale_core::db::copier::CopierRepository;
use whale_core::db::trades::TradeRepository;
use whale_core::types::{BacktestParams, BacktestRun};
use whale_core::Result;

pub use backtest::{BacktestResult, BacktestSimulator};
pub use live::LiveCopier;

/// Runs a backtest for a whale and persists its summary, returning both
/// the stored row and the full result (equity curve, per-trade rows) for
/// immediate display.
pub struct BacktestService {
    pool: PgPool,
    simulator: BacktestSimulator,
}

impl BacktestService {
    pub fn new(pool: PgPool, price_oracle: Arc<PriceOracle>) -> Self {
        Self { pool, simulator: BacktestSimulator::new(price_oracle) }
    }

    pub async fn run_and_save(&self, whale_id: uuid::Uuid, params: BacktestParams) -> Result<(BacktestRun, BacktestResult)> {
        let trades = TradeRepository::new(self.pool.clone()).all_ordered(whale_id).await?;
        let result = self.simulator.run(&trades, &params).await?;

        let run = CopierRepository::new(self.pool.clone())
            .save_run(whale_id, &params, result.roi_percent, result.max_drawdown_pct, result.trade_count)
            .await?;

        Ok((run, result))
    }
}
