//! Minimal clearinghouse info client — positions/equity snapshot plus
//! fill history, modeled on a Hyperliquid-style `/info` REST endpoint.

use serde::Deserialize;
use serde_json::json;
use whale_core::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub coin: String,
    /// Signed: negative for a short.
    pub szi: String,
    pub entry_px: Option<String>,
    pub position_value: String,
    pub unrealized_pnl: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: Position,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarginSummary {
    pub account_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearinghouseState {
    #[serde(rename = "assetPositions")]
    pub asset_positions: Vec<AssetPosition>,
    #[serde(rename = "marginSummary")]
    pub margin_summary: MarginSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fill {
    pub coin: String,
    pub px: String,
    pub sz: String,
    /// e.g. "Open Long", "Close Short".
    pub dir: String,
    pub time: i64,
    pub hash: String,
    #[serde(rename = "closedPnl")]
    pub closed_pnl: Option<String>,
}

pub struct PerpClient {
    client: reqwest::Client,
    info_url: String,
}

impl PerpClient {
    pub fn new(info_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            info_url: info_url.into(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        let resp =
            self.client.post(&self.info_url).json(&body).send().await.map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited("perp info api throttled".to_string()));
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!("perp info api returned {}", resp.status())));
        }

        resp.json().await.map_err(|e| Error::DecodeError(e.to_string()))
    }

    pub async fn clearinghouse_state(&self, address: &str) -> Result<ClearinghouseState> {
        self.post(json!({ "type": "clearinghouseState", "user": address })).await
    }

    /// Fills strictly newer than `since_millis`, matching the checkpoint
    /// contract every collector follows.
    pub async fn user_fills_since(&self, address: &str, since_millis: i64) -> Result<Vec<Fill>> {
        let fills: Vec<Fill> =
            self.post(json!({ "type": "userFillsByTime", "user": address, "startTime": since_millis })).await?;
        Ok(fills.into_iter().filter(|f| f.time > since_millis).collect())
    }
}
