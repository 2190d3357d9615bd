//! Environment-driven configuration, composed of one struct per concern.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub price_oracle: PriceOracleConfig,
    pub evm: EvmConfig,
    pub utxo: UtxoConfig,
    pub perp: PerpConfig,
    pub thresholds: ThresholdConfig,
    pub classifier: ClassifierConfig,
    pub enable_ingestors: bool,
    pub enable_scheduler: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceOracleConfig {
    pub base_url: String,
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvmConfig {
    pub rpc_http_url: Option<String>,
    pub rpc_ws_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtxoConfig {
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerpConfig {
    pub info_url: Option<String>,
}

/// Per-event-type USD thresholds above which a Trade's derived Event is
/// broadcast. See `EVENT_THRESHOLD_USD_{TYPE}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    pub large_swap_usd: rust_decimal::Decimal,
    pub large_transfer_usd: rust_decimal::Decimal,
    pub exchange_flow_usd: rust_decimal::Decimal,
    pub perp_trade_usd: rust_decimal::Decimal,
}

/// Classifier decision thresholds (spec's F_hi / V_hi).
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// 30-day trade frequency at or above which a whale counts as active.
    pub frequency_threshold: i64,
    /// Ratio of 30-day volume to current portfolio value at or above which
    /// an active whale also counts as a trader rather than a holder.
    pub volume_ratio_threshold: rust_decimal::Decimal,
}

impl ThresholdConfig {
    pub fn for_type(&self, event_type: crate::types::EventType) -> rust_decimal::Decimal {
        use crate::types::EventType::*;
        match event_type {
            LargeSwap => self.large_swap_usd,
            LargeTransfer => self.large_transfer_usd,
            ExchangeFlow => self.exchange_flow_usd,
            PerpTrade => self.perp_trade_usd,
        }
    }
}

fn env_var(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config {
        message: format!("{key} environment variable not set"),
    })
}

fn env_decimal(key: &str, default: &str) -> rust_decimal::Decimal {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| default.parse().expect("default threshold parses"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database: DatabaseConfig {
                url: env_var("DATABASE_URL")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            price_oracle: PriceOracleConfig {
                base_url: env::var("PRICE_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
                cache_ttl_seconds: env::var("PRICE_CACHE_TTL_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            },
            evm: EvmConfig {
                rpc_http_url: env::var("EVM_RPC_HTTP_URL").ok(),
                rpc_ws_url: env::var("EVM_RPC_WS_URL").ok(),
            },
            utxo: UtxoConfig {
                api_base_url: env::var("UTXO_API_BASE_URL").ok(),
            },
            perp: PerpConfig {
                info_url: env::var("PERP_INFO_URL").ok(),
            },
            thresholds: ThresholdConfig {
                large_swap_usd: env_decimal("EVENT_THRESHOLD_USD_LARGE_SWAP", "500000"),
                large_transfer_usd: env_decimal("EVENT_THRESHOLD_USD_LARGE_TRANSFER", "500000"),
                exchange_flow_usd: env_decimal("EVENT_THRESHOLD_USD_EXCHANGE_FLOW", "250000"),
                perp_trade_usd: env_decimal("EVENT_THRESHOLD_USD_PERP_TRADE", "250000"),
            },
            classifier: ClassifierConfig {
                frequency_threshold: env::var("CLASSIFIER_FREQUENCY_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                volume_ratio_threshold: env_decimal("CLASSIFIER_VOLUME_RATIO_THRESHOLD", "1.0"),
            },
            enable_ingestors: env::var("ENABLE_INGESTORS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            enable_scheduler: env::var("ENABLE_SCHEDULER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        })
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        use rust_decimal::Decimal;
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/whale_tracker_test".to_string(),
                max_connections: 2,
            },
            price_oracle: PriceOracleConfig {
                base_url: "http://localhost:0".to_string(),
                cache_ttl_seconds: 300,
            },
            evm: EvmConfig { rpc_http_url: None, rpc_ws_url: None },
            utxo: UtxoConfig { api_base_url: None },
            perp: PerpConfig { info_url: None },
            thresholds: ThresholdConfig {
                large_swap_usd: Decimal::from(500_000),
                large_transfer_usd: Decimal::from(500_000),
                exchange_flow_usd: Decimal::from(250_000),
                perp_trade_usd: Decimal::from(250_000),
            },
            classifier: ClassifierConfig {
                frequency_threshold: 10,
                volume_ratio_threshold: Decimal::from(1),
            },
            enable_ingestors: false,
            enable_scheduler: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_for_matches_env_suffix() {
        let cfg = Config::test_config();
        assert_eq!(cfg.thresholds.large_swap_usd, rust_decimal::Decimal::from(500_000));
    }
}
