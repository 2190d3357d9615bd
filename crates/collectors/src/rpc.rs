//! Minimal EVM JSON-RPC client — just the calls the EVM collector needs
//! (block height, log filtering). Modeled on a generic `rpc_call<T>`
//! helper rather than one method per RPC method, since every call shares
//! the same envelope.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use whale_core::{Error, Result};

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
}

pub struct EvmRpcClient {
    client: reqwest::Client,
    url: String,
}

impl EvmRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            url: url.into(),
        }
    }

    async fn rpc_call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T> {
        let request = JsonRpcRequest { jsonrpc: "2.0", id: 1, method, params };

        let resp = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("EVM RPC throttled: {method}")));
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!("EVM RPC returned {}: {method}", resp.status())));
        }

        let parsed: JsonRpcResponse<T> =
            resp.json().await.map_err(|e| Error::DecodeError(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(Error::DecodeError(format!("{method} rpc error {}: {}", err.code, err.message)));
        }
        parsed.result.ok_or_else(|| Error::DecodeError(format!("{method}: empty result")))
    }

    pub async fn get_block_number(&self) -> Result<u64> {
        let hex: String = self.rpc_call("eth_blockNumber", json!([])).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| Error::DecodeError(format!("bad block number {hex}: {e}")))
    }

    /// Callers must pass an address/topic filter — scanning every tx in
    /// every block is forbidden by the collector contract.
    pub async fn get_logs(&self, address: &str, topics: &[&str], from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let params = json!([{
            "address": address,
            "topics": topics,
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
        }]);
        self.rpc_call("eth_getLogs", params).await
    }
}
