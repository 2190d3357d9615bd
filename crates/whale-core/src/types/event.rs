//! Events derived from trades that cross a per-type USD threshold.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LargeSwap,
    LargeTransfer,
    ExchangeFlow,
    PerpTrade,
}

impl EventType {
    pub fn env_suffix(&self) -> &'static str {
        match self {
            EventType::LargeSwap => "LARGE_SWAP",
            EventType::LargeTransfer => "LARGE_TRANSFER",
            EventType::ExchangeFlow => "EXCHANGE_FLOW",
            EventType::PerpTrade => "PERP_TRADE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub summary: String,
    pub value_usd: Decimal,
    pub tx_hash: Option<String>,
    pub details: Value,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub whale_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub summary: String,
    pub value_usd: Decimal,
    pub tx_hash: Option<String>,
    pub details: Value,
}
