//! JSON-RPC 2.0 over HTTP implementation of [`ChainNetwork`].

use crate::error::{NetworkError, Result};
use crate::network::ChainNetwork;
use alloy_primitives::{hex, Address, Bytes};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("chainreg/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP JSON-RPC client.
///
/// One client is shared by every probe in a run; `reqwest` pools connections
/// per host underneath.
pub struct JsonRpcClient {
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Builds a client whose transport timeout matches the probe timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Transport`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends one request and returns the hex string `result`.
    async fn request(&self, url: &str, method: &str, params: Value) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(url, method, id, "JSON-RPC request");
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let envelope: Value = response.json().await?;
        decode_envelope(envelope)
    }
}

#[async_trait]
impl ChainNetwork for JsonRpcClient {
    async fn chain_id(&self, url: &str) -> Result<u64> {
        let result = self.request(url, "eth_chainId", json!([])).await?;
        parse_quantity(&result)
    }

    async fn get_code(&self, url: &str, address: Address) -> Result<Bytes> {
        let result = self
            .request(url, "eth_getCode", json!([address.to_checksum(None), "latest"]))
            .await?;
        parse_data(&result)
    }

    async fn call(&self, url: &str, to: Address, data: Bytes) -> Result<Bytes> {
        let params = json!([
            { "to": to.to_checksum(None), "data": hex::encode_prefixed(&data) },
            "latest"
        ]);
        let result = self.request(url, "eth_call", params).await?;
        parse_data(&result)
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Extracts the string `result` from a JSON-RPC response, or its error.
fn decode_envelope(envelope: Value) -> Result<String> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let error: RpcErrorObject = serde_json::from_value(error.clone())
            .map_err(|e| NetworkError::Malformed(format!("error object: {}", e)))?;
        return Err(NetworkError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    match envelope.get("result") {
        Some(Value::String(result)) => Ok(result.clone()),
        Some(other) => Err(NetworkError::Malformed(format!(
            "expected hex string result, got {}",
            other
        ))),
        None => Err(NetworkError::Malformed("missing result".to_string())),
    }
}

/// Parses a hex quantity such as `0xa` into a number.
fn parse_quantity(quantity: &str) -> Result<u64> {
    let digits = quantity
        .strip_prefix("0x")
        .filter(|d| !d.is_empty())
        .ok_or_else(|| NetworkError::Malformed(format!("invalid quantity '{}'", quantity)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| NetworkError::Malformed(format!("invalid quantity '{}'", quantity)))
}

/// Parses hex data such as `0x6080...`; `0x` is empty data.
fn parse_data(data: &str) -> Result<Bytes> {
    if !data.starts_with("0x") {
        return Err(NetworkError::Malformed(format!("invalid data '{}'", data)));
    }
    data.parse::<Bytes>()
        .map_err(|_| NetworkError::Malformed(format!("invalid data '{}'", data)))
}
