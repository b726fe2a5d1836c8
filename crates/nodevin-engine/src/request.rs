// `nodevin request`: one JSON-RPC call against a node, raw body out.

use reqwest::Client;
use serde_json::{json, Value};

use nodevin_common::constants::endpoints;
use nodevin_common::{NodevinError, Result};

use crate::catalogue::NetworkSpec;

#[derive(Debug, Clone, Default)]
pub struct RpcRequest {
    pub method: String,
    /// Raw JSON for `params`; `[]` when absent.
    pub params: Option<String>,
    /// Extra headers as `key:value` pairs.
    pub headers: Vec<(String, String)>,
    pub endpoint: Option<String>,
    pub port: Option<u16>,
    pub rpc_user: Option<String>,
    pub rpc_pass: Option<String>,
}

/// JSON-RPC 1.0 envelope sent by nodevin.
pub fn build_body(method: &str, params: Option<&str>) -> Result<Value> {
    let params = match params.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| NodevinError::Serialization(format!("invalid --params JSON: {e}")))?,
        None => json!([]),
    };
    Ok(json!({
        "jsonrpc": "1.0",
        "id": "nodevin",
        "method": method,
        "params": params,
    }))
}

/// Parse `k:v,k:v` header lists.
pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| {
            h.split_once(':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    NodevinError::Serialization(format!(
                        "invalid header '{h}', expected key:value"
                    ))
                })
        })
        .collect()
}

/// Target URL: the endpoint (default loopback) with the explicit, or the
/// network's default, port unless the endpoint already names one.
pub fn target_url(spec: &NetworkSpec, request: &RpcRequest) -> Result<String> {
    let endpoint = request
        .endpoint
        .as_deref()
        .unwrap_or(endpoints::LOCAL_RPC_HOST);
    let mut url = url::Url::parse(endpoint)
        .map_err(|e| NodevinError::HttpFailed(format!("invalid endpoint '{endpoint}': {e}")))?;
    let port = request.port.or(spec.rpc_port);
    if url.port().is_none() || request.port.is_some() {
        if let Some(port) = port {
            url.set_port(Some(port)).map_err(|_| {
                NodevinError::HttpFailed(format!("endpoint '{endpoint}' cannot take a port"))
            })?;
        }
    }
    Ok(url.to_string())
}

/// Send the request. Returns the body on HTTP 200.
pub async fn send(client: &Client, spec: &NetworkSpec, request: &RpcRequest) -> Result<String> {
    let url = target_url(spec, request)?;
    let body = build_body(&request.method, request.params.as_deref())?;
    tracing::debug!("POST {url} {body}");

    let mut builder = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body.to_string());
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    if let (Some(user), Some(pass)) = (&request.rpc_user, &request.rpc_pass) {
        builder = builder.basic_auth(user, Some(pass));
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await?;
    match status {
        200 => Ok(text),
        401 => Err(NodevinError::RpcFailed(
            "401 Unauthorized: pass --rpc-user and --rpc-pass".to_string(),
        )),
        code => Err(NodevinError::RpcFailed(format!("HTTP {code}: {text}"))),
    }
}
