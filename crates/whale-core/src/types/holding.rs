//! Current-snapshot holdings, replaced wholesale on each refresh.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chain::Chain;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub whale_id: Uuid,
    pub asset: String,
    pub chain: Chain,
    pub amount: Decimal,
    pub usd_value: Option<Decimal>,
    pub portfolio_percent: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHolding {
    pub asset: String,
    pub chain: Chain,
    pub amount: Decimal,
    pub usd_value: Option<Decimal>,
}
