//! The append-only Trade record and its supporting enums.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    Onchain,
    Perp,
    ExchangeFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
    Deposit,
    Withdraw,
    Long,
    Short,
    CloseLong,
    CloseShort,
}

impl TradeDirection {
    /// Directions that close an existing position and therefore realize
    /// PnL against open cost-basis lots.
    pub fn is_closing(&self) -> bool {
        matches!(self, TradeDirection::Sell | TradeDirection::CloseLong | TradeDirection::CloseShort)
    }

    /// Directions that open or add to a position.
    pub fn is_opening(&self) -> bool {
        matches!(self, TradeDirection::Buy | TradeDirection::Long | TradeDirection::Short)
    }
}

/// A normalized, append-only action attributable to a whale.
///
/// Invariant: at most one row per `(whale, tx_hash)` where `tx_hash` is
/// non-null. Perp fills carry **signed** base amount — closes store
/// negative sizes, never absolute values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: TradeSource,
    pub platform: String,
    pub direction: TradeDirection,
    pub base_asset: String,
    pub quote_asset: Option<String>,
    /// Signed — negative for a sell/close/short-reducing fill.
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
    /// `None` when the Price Oracle had no known price at trade time.
    pub usd_notional: Option<Decimal>,
    pub realized_pnl_usd: Option<Decimal>,
    pub realized_pnl_percent: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub tx_hash: Option<String>,
    pub catalog_version: Option<i32>,
}

/// A record normalized by a collector but not yet persisted, carrying
/// whatever dedupe key the upstream source provides.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub whale_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: TradeSource,
    pub platform: String,
    pub direction: TradeDirection,
    pub base_asset: String,
    pub quote_asset: Option<String>,
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
    pub usd_notional: Option<Decimal>,
    pub realized_pnl_usd: Option<Decimal>,
    pub realized_pnl_percent: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub tx_hash: Option<String>,
    pub catalog_version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeFilters {
    pub source: Option<TradeSource>,
    pub direction: Option<TradeDirection>,
    pub chain: Option<super::chain::Chain>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_directions() {
        assert!(TradeDirection::CloseLong.is_closing());
        assert!(TradeDirection::CloseShort.is_closing());
        assert!(TradeDirection::Sell.is_closing());
        assert!(!TradeDirection::Buy.is_closing());
    }

    #[test]
    fn opening_directions() {
        assert!(TradeDirection::Buy.is_opening());
        assert!(TradeDirection::Long.is_opening());
        assert!(!TradeDirection::CloseLong.is_opening());
    }
}
