// Chain probes: JSON-RPC calls against local nodes and global block-height
// oracles. Every failure collapses to 0.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use nodevin_common::constants::endpoints;

use crate::catalogue::Software;

/// Reference block-height endpoint for a (software, testnet) pair.
pub fn oracle_url(software: Software, testnet: bool) -> Option<&'static str> {
    match (software, testnet) {
        (Software::Bitcoin, false) => Some("https://blockchain.info/latestblock"),
        (Software::Bitcoin, true) => Some("https://api.blockcypher.com/v1/btc/test3"),
        (Software::Litecoin, false) => Some("https://api.blockcypher.com/v1/ltc/main"),
        (Software::Dogecoin, false) => Some("https://api.blockcypher.com/v1/doge/main"),
        // BlockCypher serves no ltc/doge test3 chains; those rows show a global height of 0.
        _ => None,
    }
}

/// Numeric `result` of a JSON-RPC response, or 0 when the status is not 200,
/// `error` is set, or `result` is not a number.
pub fn decode_rpc_number(status: u16, body: &str) -> u64 {
    if status != 200 {
        return 0;
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return 0;
    };
    if !value.get("error").map(Value::is_null).unwrap_or(true) {
        return 0;
    }
    value.get("result").and_then(Value::as_u64).unwrap_or(0)
}

/// `height` field of an oracle response, or 0.
pub fn decode_oracle_height(status: u16, body: &str) -> u64 {
    if status != 200 {
        return 0;
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("height").and_then(Value::as_u64))
        .unwrap_or(0)
}

/// Source of per-node and global chain heights.
#[async_trait]
pub trait ChainProbe: Send + Sync {
    /// Call `method` on the node listening on `port`.
    async fn rpc_number(&self, port: u16, method: &str) -> u64;

    /// Global reference height for the chain.
    async fn global_height(&self, software: Software, testnet: bool) -> u64;
}

/// [`ChainProbe`] over HTTP.
pub struct HttpChainProbe {
    local: Client,
    public: Client,
    rpc_host: String,
    credentials: Option<(String, String)>,
    oracle_base: Option<String>,
}

impl HttpChainProbe {
    pub fn new(local: Client, public: Client, credentials: Option<(String, String)>) -> Self {
        Self {
            local,
            public,
            rpc_host: endpoints::LOCAL_RPC_HOST.to_string(),
            credentials,
            oracle_base: None,
        }
    }

    /// Send oracle requests to `base` + the oracle path instead of the public host.
    pub fn with_oracle_base(mut self, base: impl Into<String>) -> Self {
        self.oracle_base = Some(base.into());
        self
    }

    fn oracle_target(&self, url: &str) -> String {
        match self.oracle_base {
            Some(ref base) => {
                let path = url::Url::parse(url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_default();
                format!("{}{path}", base.trim_end_matches('/'))
            }
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl ChainProbe for HttpChainProbe {
    async fn rpc_number(&self, port: u16, method: &str) -> u64 {
        let url = format!("{}:{port}", self.rpc_host);
        let body = json!({
            "jsonrpc": "1.0",
            "id": "nodevin",
            "method": method,
            "params": [],
        });
        let mut request = self.local.post(&url).json(&body);
        if let Some((ref user, ref pass)) = self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                decode_rpc_number(status, &text)
            }
            Err(e) => {
                tracing::debug!("RPC {method} on port {port} failed: {e}");
                0
            }
        }
    }

    async fn global_height(&self, software: Software, testnet: bool) -> u64 {
        let Some(url) = oracle_url(software, testnet) else {
            return 0;
        };
        let target = self.oracle_target(url);
        match self.public.get(&target).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                decode_oracle_height(status, &text)
            }
            Err(e) => {
                tracing::debug!("Oracle {target} failed: {e}");
                0
            }
        }
    }
}
