use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use builder_codes_core::PortError;

/// Blocking JSON-RPC 2.0 over HTTP POST.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    url: String,
    client: reqwest::blocking::Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, PortError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(url = %self.url, method, %payload, "json-rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| PortError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| PortError::Transport(format!("{method} json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{method} http status {status}: {body}"
            )));
        }
        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| err.to_string());
            return Err(PortError::Transport(format!("{method} returned error: {message}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{method} response missing result")))
    }
}

pub fn parse_hex_u64(value: &Value, what: &str) -> Result<u64, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Transport(format!("{what} must be a hex string")))?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| PortError::Transport(format!("{what} missing 0x prefix: {raw}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| PortError::Transport(format!("invalid {what} {raw}: {e}")))
}
