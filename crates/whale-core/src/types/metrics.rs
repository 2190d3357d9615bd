//! Daily and current metrics snapshots produced by the Metrics Engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per `(whale, date)` after a rebuild. No duplicates; gaps only
/// where the whale had no history yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMetricsDaily {
    pub whale_id: Uuid,
    pub date: NaiveDate,
    pub portfolio_value_usd: Decimal,
    pub roi_percent: Decimal,
    pub realized_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub volume_1d_usd: Decimal,
    pub trades_1d: i64,
    pub win_rate_percent: Decimal,
}

/// Mirrors the most recent `WalletMetricsDaily` row for fast single-whale
/// reads without a date-range scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWalletMetrics {
    pub whale_id: Uuid,
    pub as_of: DateTime<Utc>,
    pub portfolio_value_usd: Decimal,
    pub roi_percent: Decimal,
    pub realized_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub volume_1d_usd: Decimal,
    pub trades_1d: i64,
    pub win_rate_percent: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiPoint {
    pub timestamp: DateTime<Utc>,
    pub roi_percent: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioPoint {
    pub timestamp: DateTime<Utc>,
    pub value_usd: Decimal,
}
