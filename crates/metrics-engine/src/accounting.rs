//! FIFO cost-basis accounting shared by the incremental and full-rebuild
//! paths, so the two can never diverge on how a trade affects lots, cash
//! or realized PnL.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use whale_core::types::{Trade, TradeDirection};

/// One FIFO lot: an opening fill not yet (fully) closed.
#[derive(Debug, Clone)]
pub struct Lot {
    pub quantity: Decimal,
    /// Total USD cost of `quantity` — `None` when the opening trade had
    /// no known price; such lots still occupy their place in the queue
    /// (quantity must still net out) but never contribute cost or value.
    pub cost_usd: Option<Decimal>,
}

/// Outcome of applying one trade, used by the caller to accumulate
/// per-day volume/trade-count/win-rate figures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeOutcome {
    pub volume_usd: Option<Decimal>,
    pub realized_pnl_usd: Option<Decimal>,
    pub closed: bool,
}

/// Running FIFO lots per asset, plus the cash ledger (deposits/withdrawals)
/// and cumulative realized-PnL/win-rate counters needed for ROI.
#[derive(Debug, Default)]
pub struct Accountant {
    books: HashMap<String, VecDeque<Lot>>,
    pub deposits_usd: Decimal,
    pub withdrawals_usd: Decimal,
    pub realized_pnl_total_usd: Decimal,
    pub closed_count: i64,
    pub winning_closed_count: i64,
}

impl Accountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one trade in timestamp order. Buys/longs/shorts open a lot;
    /// sells/closes consume lots FIFO and realize PnL pro rata across the
    /// lots they close; deposits/withdrawals only move the cash ledger.
    pub fn apply(&mut self, trade: &Trade) -> TradeOutcome {
        match trade.direction {
            TradeDirection::Deposit => {
                if let Some(usd) = trade.usd_notional {
                    self.deposits_usd += usd;
                }
                TradeOutcome { volume_usd: trade.usd_notional, ..Default::default() }
            }
            TradeDirection::Withdraw => {
                if let Some(usd) = trade.usd_notional {
                    self.withdrawals_usd += usd;
                }
                TradeOutcome { volume_usd: trade.usd_notional, ..Default::default() }
            }
            dir if dir.is_opening() => {
                let quantity = trade.base_amount.abs();
                let book = self.books.entry(trade.base_asset.clone()).or_default();
                book.push_back(Lot { quantity, cost_usd: trade.usd_notional });
                TradeOutcome { volume_usd: trade.usd_notional, ..Default::default() }
            }
            dir if dir.is_closing() => {
                let mut remaining = trade.base_amount.abs();
                let book = self.books.entry(trade.base_asset.clone()).or_default();
                let mut consumed_cost = Decimal::ZERO;
                let mut consumed_cost_known = true;

                while remaining > Decimal::ZERO {
                    let Some(front) = book.front_mut() else { break };
                    if front.quantity <= Decimal::ZERO {
                        book.pop_front();
                        continue;
                    }
                    let take = remaining.min(front.quantity);
                    let lot_unit_cost = front.cost_usd.map(|c| c / front.quantity);
                    match lot_unit_cost {
                        Some(unit) => consumed_cost += unit * take,
                        None => consumed_cost_known = false,
                    }
                    if let Some(cost) = front.cost_usd.as_mut() {
                        *cost -= lot_unit_cost.unwrap_or_default() * take;
                    }
                    front.quantity -= take;
                    remaining -= take;
                    if front.quantity <= Decimal::ZERO {
                        book.pop_front();
                    }
                }

                // Already-known realized PnL (e.g. perp fills carry it
                // from the clearinghouse ledger) wins over a recomputed
                // figure; otherwise derive it from proceeds minus cost.
                let realized = trade.realized_pnl_usd.or_else(|| {
                    if !consumed_cost_known {
                        return None;
                    }
                    trade.usd_notional.map(|proceeds| proceeds - consumed_cost)
                });

                if let Some(pnl) = realized {
                    self.realized_pnl_total_usd += pnl;
                    self.closed_count += 1;
                    if pnl > Decimal::ZERO {
                        self.winning_closed_count += 1;
                    }
                }

                TradeOutcome { volume_usd: trade.usd_notional, realized_pnl_usd: realized, closed: true }
            }
            _ => TradeOutcome::default(),
        }
    }

    /// Value of every open lot at `price_for`, skipping assets with no
    /// known price rather than fabricating one. Returns `(value, cost)`.
    pub fn open_position_value<F>(&self, mut price_for: F) -> (Decimal, Decimal)
    where
        F: FnMut(&str) -> Option<Decimal>,
    {
        let mut value = Decimal::ZERO;
        let mut cost = Decimal::ZERO;
        for (asset, lots) in &self.books {
            let quantity: Decimal = lots.iter().map(|l| l.quantity).sum();
            if quantity <= Decimal::ZERO {
                continue;
            }
            let lot_cost: Decimal = lots.iter().filter_map(|l| l.cost_usd).sum();
            cost += lot_cost;
            if let Some(price) = price_for(asset) {
                value += quantity * price;
            }
        }
        (value, cost)
    }

    pub fn open_assets(&self) -> Vec<String> {
        self.books
            .iter()
            .filter(|(_, lots)| lots.iter().map(|l| l.quantity).sum::<Decimal>() > Decimal::ZERO)
            .map(|(asset, _)| asset.clone())
            .collect()
    }

    /// Closed positions with positive realized PnL / total closed to date.
    /// Zero when nothing has closed yet — never a divide-by-zero.
    pub fn win_rate_percent(&self) -> Decimal {
        if self.closed_count == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_closed_count) / Decimal::from(self.closed_count) * Decimal::from(100)
    }

    /// ROI = (current value + withdrawals - deposits) / deposits * 100.
    /// A whale with zero deposits reports 0, never a divide-by-zero.
    pub fn roi_percent(&self, current_value: Decimal) -> Decimal {
        if self.deposits_usd <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (current_value + self.withdrawals_usd - self.deposits_usd) / self.deposits_usd * Decimal::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn trade(direction: TradeDirection, amount: Decimal, usd: Option<Decimal>) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            whale_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: whale_core::types::TradeSource::Onchain,
            platform: "test".to_string(),
            direction,
            base_asset: "BTC".to_string(),
            quote_asset: Some("USD".to_string()),
            base_amount: amount,
            quote_amount: Decimal::ZERO,
            usd_notional: usd,
            realized_pnl_usd: None,
            realized_pnl_percent: None,
            open_price: None,
            close_price: None,
            tx_hash: None,
            catalog_version: None,
        }
    }

    #[test]
    fn buy_then_sell_realizes_pnl() {
        let mut acct = Accountant::new();
        acct.apply(&trade(TradeDirection::Deposit, Decimal::ZERO, Some(Decimal::from(10_000))));
        acct.apply(&trade(TradeDirection::Buy, Decimal::ONE, Some(Decimal::from(50_000))));
        let outcome = acct.apply(&trade(TradeDirection::Sell, Decimal::NEGATIVE_ONE, Some(Decimal::from(60_000))));

        assert_eq!(outcome.realized_pnl_usd, Some(Decimal::from(10_000)));
        assert_eq!(acct.realized_pnl_total_usd, Decimal::from(10_000));
        assert_eq!(acct.roi_percent(Decimal::ZERO), Decimal::from(100));
    }

    #[test]
    fn zero_deposits_yields_zero_roi() {
        let acct = Accountant::new();
        assert_eq!(acct.roi_percent(Decimal::from(500)), Decimal::ZERO);
    }

    #[test]
    fn partial_close_apportions_cost_pro_rata() {
        let mut acct = Accountant::new();
        acct.apply(&trade(TradeDirection::Buy, Decimal::from(2), Some(Decimal::from(200))));
        let outcome = acct.apply(&trade(TradeDirection::Sell, Decimal::NEGATIVE_ONE, Some(Decimal::from(150))));
        // Half the lot (cost 100) closed against proceeds of 150.
        assert_eq!(outcome.realized_pnl_usd, Some(Decimal::from(50)));
    }

    #[test]
    fn unknown_price_trade_does_not_produce_realized_pnl() {
        let mut acct = Accountant::new();
        acct.apply(&trade(TradeDirection::Buy, Decimal::ONE, None));
        let outcome = acct.apply(&trade(TradeDirection::Sell, Decimal::NEGATIVE_ONE, None));
        assert_eq!(outcome.realized_pnl_usd, None);
        assert_eq!(acct.closed_count, 0);
    }

    #[test]
    fn perp_close_uses_ledger_realized_pnl_when_present() {
        let mut acct = Accountant::new();
        acct.apply(&trade(TradeDirection::Long, Decimal::from(2), Some(Decimal::from(1000))));
        let mut close = trade(TradeDirection::CloseLong, Decimal::new(-5, 1), Some(Decimal::from(300)));
        close.realized_pnl_usd = Some(Decimal::from(42));
        let outcome = acct.apply(&close);
        assert_eq!(outcome.realized_pnl_usd, Some(Decimal::from(42)));
        assert_eq!(acct.winning_closed_count, 1);
    }

    #[test]
    fn no_closed_positions_yields_zero_win_rate() {
        let acct = Accountant::new();
        assert_eq!(acct.win_rate_percent(), Decimal::ZERO);
    }
}
