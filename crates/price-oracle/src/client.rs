//! HTTP client against the configured price API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use whale_core::{Error, Result};

/// Abstraction over the upstream price API so the oracle and collectors can
/// be tested against a `mockall`-generated mock instead of a live HTTP
/// endpoint.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_spot(&self, asset: &str) -> Result<Option<Decimal>>;
    async fn fetch_spot_many(&self, assets: &[String]) -> Result<HashMap<String, Decimal>>;
    async fn fetch_historical(&self, asset: &str, at: DateTime<Utc>) -> Result<Option<Decimal>>;
}

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    #[serde(flatten)]
    prices: HashMap<String, HashMap<String, f64>>,
}

pub struct HttpPriceClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPriceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceClient {
    async fn fetch_spot(&self, asset: &str) -> Result<Option<Decimal>> {
        let map = self.fetch_spot_many(std::slice::from_ref(&asset.to_string())).await?;
        Ok(map.get(asset).copied())
    }

    async fn fetch_spot_many(&self, assets: &[String]) -> Result<HashMap<String, Decimal>> {
        if assets.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/simple/price", self.base_url);
        let ids = assets.join(",");
        let resp = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("price API throttled: {url}")));
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!("price API returned {}", resp.status())));
        }

        let parsed: SimplePriceResponse =
            resp.json().await.map_err(|e| Error::DecodeError(e.to_string()))?;

        let mut out = HashMap::new();
        for asset in assets {
            if let Some(usd) = parsed.prices.get(asset).and_then(|m| m.get("usd")) {
                if let Some(d) = Decimal::from_f64(*usd) {
                    out.insert(asset.clone(), d);
                }
            }
        }
        Ok(out)
    }

    async fn fetch_historical(&self, asset: &str, at: DateTime<Utc>) -> Result<Option<Decimal>> {
        let url = format!("{}/coins/{}/history", self.base_url, asset);
        let date = at.format("%d-%m-%Y").to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("date", date.as_str())])
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("price API throttled: {url}")));
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!("price API returned {}", resp.status())));
        }

        #[derive(Deserialize)]
        struct HistoryResponse {
            market_data: Option<MarketData>,
        }
        #[derive(Deserialize)]
        struct MarketData {
            current_price: HashMap<String, f64>,
        }

        let parsed: HistoryResponse = resp.json().await.map_err(|e| Error::DecodeError(e.to_string()))?;
        Ok(parsed
            .market_data
            .and_then(|m| m.current_price.get("usd").copied())
            .and_then(Decimal::from_f64))
    }
}
