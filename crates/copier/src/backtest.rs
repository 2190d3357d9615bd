//! Backtest simulator: historical replay of a whale's trades through a
//! flat fee/slippage/leverage cost model, narrowed from the richer
//! volume/depth/probabilistic models a market-making backtester needs down
//! to the single `fee_bps`/`slippage_bps`/`leverage` inputs this system
//! actually takes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use price_oracle::PriceOracle;
use whale_core::types::{BacktestParams, Trade, TradeDirection};
use whale_core::Result;

/// Cap on per-minute mark-to-market steps between two trades, so a
/// multi-year window with a thin trade history can't spin the simulator
/// for hours. A capped run still produces a result; it just samples the
/// equity curve coarser than 1 minute over the skipped span.
const MAX_MARK_STEPS_PER_GAP: i64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Long,
    Short,
}

struct SimulatedPosition {
    side: Side,
    quantity: Decimal,
    entry_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyTradeRow {
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub direction: TradeDirection,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee_usd: Decimal,
    pub slippage_usd: Decimal,
    pub realized_pnl_usd: Option<Decimal>,
    pub cumulative_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub equity_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub recommended_position_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub max_drawdown_usd: Decimal,
    pub roi_percent: Decimal,
    pub net_pnl_usd: Decimal,
    pub trade_count: i64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<CopyTradeRow>,
}

pub struct BacktestSimulator {
    price_oracle: Arc<PriceOracle>,
}

impl BacktestSimulator {
    pub fn new(price_oracle: Arc<PriceOracle>) -> Self {
        Self { price_oracle }
    }

    pub async fn run(&self, all_trades: &[Trade], params: &BacktestParams) -> Result<BacktestResult> {
        let trades: Vec<&Trade> = all_trades
            .iter()
            .filter(|t| params.assets.as_ref().map_or(true, |assets| assets.contains(&t.base_asset)))
            .filter(|t| params.from.map_or(true, |from| t.timestamp >= from))
            .filter(|t| params.to.map_or(true, |to| t.timestamp <= to))
            .collect();

        let mut equity = params.initial_deposit;
        let mut positions: HashMap<String, SimulatedPosition> = HashMap::new();
        let mut cumulative_pnl = Decimal::ZERO;
        let mut equity_curve = Vec::new();
        let mut rows = Vec::new();

        let mut peak = equity;
        let mut max_dd_pct = Decimal::ZERO;
        let mut max_dd_usd = Decimal::ZERO;

        let mut wins = 0i64;
        let mut losses = 0i64;
        let mut total_win = Decimal::ZERO;
        let mut total_loss_abs = Decimal::ZERO;
        let mut closed_count = 0i64;

        let Some(first) = trades.first() else {
            return Ok(BacktestResult {
                recommended_position_pct: Decimal::ZERO,
                max_drawdown_pct: Decimal::ZERO,
                max_drawdown_usd: Decimal::ZERO,
                roi_percent: Decimal::ZERO,
                net_pnl_usd: Decimal::ZERO,
                trade_count: 0,
                equity_curve: vec![],
                trades: vec![],
            });
        };

        let mut cursor_time = first.timestamp;

        for trade in &trades {
            self.mark_to_market(&mut equity_curve, &positions, cursor_time, trade.timestamp, equity).await?;

            let fee_rate = params.fee_bps / Decimal::from(10_000);
            let slippage_rate = params.slippage_bps / Decimal::from(10_000);

            if trade.direction.is_opening() {
                let Some(raw_price) = raw_price(trade, trade.open_price) else {
                    cursor_time = trade.timestamp;
                    continue;
                };
                let side = match trade.direction {
                    TradeDirection::Short => Side::Short,
                    _ => Side::Long,
                };
                let notional = equity * params.position_pct * params.leverage;
                let (new_equity, fee, slippage, quantity) = open_leg(equity, notional, fee_rate, slippage_rate, raw_price);

                equity = new_equity;
                positions.insert(trade.base_asset.clone(), SimulatedPosition { side, quantity, entry_price: raw_price });

                let unrealized = self.unrealized_total(&positions, trade.timestamp).await?;
                rows.push(CopyTradeRow {
                    timestamp: trade.timestamp,
                    asset: trade.base_asset.clone(),
                    direction: trade.direction,
                    quantity,
                    price: raw_price,
                    fee_usd: fee,
                    slippage_usd: slippage,
                    realized_pnl_usd: None,
                    cumulative_pnl_usd: cumulative_pnl,
                    unrealized_pnl_usd: unrealized,
                    equity_usd: equity,
                });
            } else if trade.direction.is_closing() {
                if let Some(pos) = positions.remove(&trade.base_asset) {
                    let Some(raw_price) = raw_price(trade, trade.close_price) else {
                        positions.insert(trade.base_asset.clone(), pos);
                        cursor_time = trade.timestamp;
                        continue;
                    };
                    let pnl = close_leg(&pos, raw_price);

                    equity += pnl;
                    cumulative_pnl += pnl;
                    closed_count += 1;
                    if pnl > Decimal::ZERO {
                        wins += 1;
                        total_win += pnl;
                    } else if pnl < Decimal::ZERO {
                        losses += 1;
                        total_loss_abs += pnl.abs();
                    }

                    let unrealized = self.unrealized_total(&positions, trade.timestamp).await?;
                    rows.push(CopyTradeRow {
                        timestamp: trade.timestamp,
                        asset: trade.base_asset.clone(),
                        direction: trade.direction,
                        quantity: pos.quantity,
                        price: raw_price,
                        fee_usd: Decimal::ZERO,
                        slippage_usd: Decimal::ZERO,
                        realized_pnl_usd: Some(pnl),
                        cumulative_pnl_usd: cumulative_pnl,
                        unrealized_pnl_usd: unrealized,
                        equity_usd: equity,
                    });
                }
            }

            peak = peak.max(equity);
            if peak > Decimal::ZERO {
                let drawdown = peak - equity;
                let dd_pct = drawdown / peak * Decimal::from(100);
                if dd_pct > max_dd_pct {
                    max_dd_pct = dd_pct;
                    max_dd_usd = drawdown;
                }
            }

            equity_curve.push(EquityPoint { timestamp: trade.timestamp, equity_usd: equity });
            cursor_time = trade.timestamp;
        }

        let net_pnl_usd = equity - params.initial_deposit;
        let roi_percent = if params.initial_deposit > Decimal::ZERO {
            net_pnl_usd / params.initial_deposit * Decimal::from(100)
        } else {
            Decimal::ZERO
        };

        let recommended_position_pct = recommend_position_pct(wins, losses, total_win, total_loss_abs);

        Ok(BacktestResult {
            recommended_position_pct,
            max_drawdown_pct: max_dd_pct,
            max_drawdown_usd: max_dd_usd,
            roi_percent,
            net_pnl_usd,
            trade_count: closed_count,
            equity_curve,
            trades: rows,
        })
    }

    /// Samples the equity curve at 1-minute resolution between two trade
    /// timestamps, marking open positions to the Price Oracle's historical
    /// price at each step.
    async fn mark_to_market(
        &self,
        equity_curve: &mut Vec<EquityPoint>,
        positions: &HashMap<String, SimulatedPosition>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cash_equity: Decimal,
    ) -> Result<()> {
        if positions.is_empty() || to <= from {
            return Ok(());
        }

        let total_minutes = (to - from).num_minutes();
        let step_minutes = if total_minutes > MAX_MARK_STEPS_PER_GAP {
            total_minutes / MAX_MARK_STEPS_PER_GAP
        } else {
            1
        }
        .max(1);

        let mut t = from + Duration::minutes(step_minutes);
        while t < to {
            let unrealized = self.unrealized_total(positions, t).await?;
            equity_curve.push(EquityPoint { timestamp: t, equity_usd: cash_equity + unrealized });
            t += Duration::minutes(step_minutes);
        }
        Ok(())
    }

    async fn unrealized_total(&self, positions: &HashMap<String, SimulatedPosition>, at: DateTime<Utc>) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for (asset, pos) in positions {
            if let Some(price) = self.price_oracle.historical(asset, at).await? {
                let pnl = match pos.side {
                    Side::Long => (price - pos.entry_price) * pos.quantity,
                    Side::Short => (pos.entry_price - price) * pos.quantity,
                };
                total += pnl;
            }
        }
        Ok(total)
    }
}

fn raw_price(trade: &Trade, explicit: Option<Decimal>) -> Option<Decimal> {
    explicit.or_else(|| {
        if trade.base_amount.is_zero() {
            None
        } else {
            trade.usd_notional.map(|notional| notional / trade.base_amount.abs())
        }
    })
}

/// Charges the full round-trip fee and slippage up front, at position open,
/// against the unadjusted `raw_price` — the exit leg realizes PnL off that
/// same price with no further cost applied.
fn open_leg(
    equity: Decimal,
    notional: Decimal,
    fee_rate: Decimal,
    slippage_rate: Decimal,
    raw_price: Decimal,
) -> (Decimal, Decimal, Decimal, Decimal) {
    let fee = notional * fee_rate;
    let slippage = notional * slippage_rate;
    let quantity = if raw_price > Decimal::ZERO { notional / raw_price } else { Decimal::ZERO };
    (equity - fee - slippage, fee, slippage, quantity)
}

fn close_leg(pos: &SimulatedPosition, raw_price: Decimal) -> Decimal {
    match pos.side {
        Side::Long => (raw_price - pos.entry_price) * pos.quantity,
        Side::Short => (pos.entry_price - raw_price) * pos.quantity,
    }
}

/// Kelly-fraction approximation from observed win-rate and average
/// win/loss, clipped to the spec's `[0, 50]` percent band.
fn recommend_position_pct(wins: i64, losses: i64, total_win: Decimal, total_loss_abs: Decimal) -> Decimal {
    let closed = wins + losses;
    if closed == 0 {
        return Decimal::ZERO;
    }
    let win_rate = Decimal::from(wins) / Decimal::from(closed);
    if losses == 0 || total_loss_abs == Decimal::ZERO {
        return (win_rate * Decimal::from(100)).min(Decimal::from(50)).max(Decimal::ZERO);
    }

    let avg_win = total_win / Decimal::from(wins.max(1));
    let avg_loss = total_loss_abs / Decimal::from(losses);
    if avg_loss == Decimal::ZERO {
        return Decimal::ZERO;
    }
    let payoff_ratio = avg_win / avg_loss;
    let kelly = win_rate - (Decimal::ONE - win_rate) / payoff_ratio;
    (kelly * Decimal::from(100)).max(Decimal::ZERO).min(Decimal::from(50))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelly_clips_to_fifty_with_no_losses() {
        let pct = recommend_position_pct(10, 0, Decimal::from(100), Decimal::ZERO);
        assert_eq!(pct, Decimal::from(50));
    }

    #[test]
    fn kelly_is_zero_with_no_closed_trades() {
        assert_eq!(recommend_position_pct(0, 0, Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn kelly_penalizes_poor_payoff_ratio() {
        // 40% win rate, average win much smaller than average loss.
        let pct = recommend_position_pct(4, 6, Decimal::from(40), Decimal::from(600));
        assert!(pct < Decimal::from(10));
    }

    /// Deposit $1,000, fee_bps=10, slippage_bps=10, leverage=1, one whale
    /// round-trip buy at $100 then sell at $110 (a 10% gross move): this is
    /// the same open/close arithmetic `BacktestSimulator::run` applies per
    /// trade, replayed directly so the assertion doesn't need a live price
    /// oracle. Round-trip cost is `1000 * (10 + 10) / 10_000 = $2`, so net
    /// PnL is $98 and ROI is 9.8%.
    #[test]
    fn backtest_small_round_trip_matches_worked_example() {
        let initial_deposit = Decimal::from(1_000);
        let position_pct = Decimal::ONE;
        let leverage = Decimal::ONE;
        let fee_rate = Decimal::from(10) / Decimal::from(10_000);
        let slippage_rate = Decimal::from(10) / Decimal::from(10_000);

        let notional = initial_deposit * position_pct * leverage;
        let (equity_after_open, fee, slippage, quantity) =
            open_leg(initial_deposit, notional, fee_rate, slippage_rate, Decimal::from(100));

        assert_eq!(fee, Decimal::ONE);
        assert_eq!(slippage, Decimal::ONE);
        assert_eq!(quantity, Decimal::from(10));

        let pos = SimulatedPosition { side: Side::Long, quantity, entry_price: Decimal::from(100) };
        let pnl = close_leg(&pos, Decimal::from(110));
        let equity_after_close = equity_after_open + pnl;

        let net_pnl = equity_after_close - initial_deposit;
        let roi_percent = net_pnl / initial_deposit * Decimal::from(100);

        assert_eq!(net_pnl, Decimal::from(98));
        assert_eq!(roi_percent, Decimal::new(98, 1));
    }
}
