//! Minimal Esplora-compatible REST client — just the address-history
//! endpoint the UTXO collector needs, paginated via `last_tx_id`.

use serde::Deserialize;
use whale_core::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Vin {
    pub prevout: Option<PrevOut>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vout {
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrevOut {
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraTx {
    pub txid: String,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
    pub status: TxStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    pub block_time: Option<i64>,
}

pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
        }
    }

    /// Returns up to 25 transactions newer than `after_txid`, oldest-first
    /// page ordering matching Esplora's `/address/:addr/txs/chain/:last_seen_txid`.
    pub async fn address_txs(&self, address: &str, after_txid: Option<&str>) -> Result<Vec<EsploraTx>> {
        let url = match after_txid {
            Some(txid) => format!("{}/address/{address}/txs/chain/{txid}", self.base_url),
            None => format!("{}/address/{address}/txs", self.base_url),
        };

        let resp = self.client.get(&url).send().await.map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited("esplora address txs throttled".to_string()));
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!("esplora returned {}", resp.status())));
        }

        resp.json().await.map_err(|e| Error::DecodeError(e.to_string()))
    }
}
