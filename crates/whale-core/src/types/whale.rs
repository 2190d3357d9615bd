//! Whale identity and classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chain::Chain;

/// Whale identity is `(chain, address)`; the id is assigned on first
/// insert and is opaque to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whale {
    pub id: Uuid,
    pub chain: Chain,
    pub address: String,
    pub classification: WhaleClassification,
    pub labels: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Whale {
    /// Derived explorer URL, built rather than stored.
    pub fn explorer_url(&self) -> String {
        match self.chain {
            Chain::Evm => format!("https://etherscan.io/address/{}", self.address),
            Chain::Utxo => format!("https://mempool.space/address/{}", self.address),
            Chain::Perp => format!("https://app.hyperliquid.xyz/explorer/address/{}", self.address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WhaleClassification {
    Unclassified,
    Holder,
    Trader,
    HolderTrader,
}

impl Default for WhaleClassification {
    fn default() -> Self {
        WhaleClassification::Unclassified
    }
}

/// Request shape for `POST /whales`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWhale {
    pub chain: Chain,
    pub address: String,
    pub labels: Option<Vec<String>>,
    pub classification: Option<WhaleClassification>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhaleFilters {
    pub chain: Option<Chain>,
    pub classification: Option<WhaleClassification>,
    pub min_roi: Option<f64>,
    pub activity_window_days: Option<i64>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explorer_url_varies_by_chain() {
        let whale = Whale {
            id: Uuid::new_v4(),
            chain: Chain::Evm,
            address: "0xabc".into(),
            classification: WhaleClassification::Trader,
            labels: vec![],
            first_seen: Utc::now(),
            last_active: Utc::now(),
        };
        assert!(whale.explorer_url().contains("etherscan.io"));
    }

    #[test]
    fn default_classification_is_unclassified() {
        assert_eq!(WhaleClassification::default(), WhaleClassification::Unclassified);
    }
}
