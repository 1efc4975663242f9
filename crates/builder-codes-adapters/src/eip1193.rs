use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{keccak256, Address, B256};
use serde_json::{json, Value};

use builder_codes_core::attribution::append_suffix;
use builder_codes_core::{
    Call, CallBatchStatus, CallReceipt, CallsId, ConnectorInfo, DataSuffix, PortError,
    ProviderPort, SendCallsRequest, SupportedChain,
};

use crate::rpc::{parse_hex_u64, JsonRpcClient};
use crate::AppConfig;

pub const PROXY_CONNECTOR_UID: &str = "baseAccount";
pub const DEMO_CONNECTOR_UID: &str = "demo";

/// Wallet connector speaking EIP-1193 methods plus the EIP-5792 batch calls.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    info: ConnectorInfo,
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    /// In-process wallet that fabricates ids and receipts; nothing is signed.
    Deterministic { pending_polls: u32 },
    Proxy(JsonRpcClient),
}

/// A batch as the demo wallet recorded it, with the suffix already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    pub id: CallsId,
    pub chain_id: u64,
    pub from: Address,
    pub calls: Vec<Call>,
    pub data_suffix: Option<DataSuffix>,
    pub polls: u32,
}

#[derive(Debug, Clone)]
struct ProviderState {
    accounts: Vec<Address>,
    chain_id: u64,
    authorized: bool,
    batch_seq: u64,
    batches: Vec<SubmittedBatch>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            accounts: vec![Address::with_last_byte(1)],
            chain_id: SupportedChain::BaseSepolia.chain_id(),
            authorized: false,
            batch_seq: 0,
            batches: Vec::new(),
        }
    }
}

impl Eip1193Adapter {
    pub fn deterministic(config: &AppConfig) -> Self {
        let state = ProviderState {
            chain_id: config.default_chain.chain_id(),
            ..ProviderState::default()
        };
        Self {
            info: ConnectorInfo {
                uid: DEMO_CONNECTOR_UID.to_owned(),
                name: "Demo Wallet".to_owned(),
            },
            mode: ProviderMode::Deterministic {
                pending_polls: config.demo_pending_polls,
            },
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn proxy(config: &AppConfig, url: &str) -> Self {
        let info = ConnectorInfo {
            uid: PROXY_CONNECTOR_UID.to_owned(),
            name: config.connector_name.clone(),
        };
        let mode = match JsonRpcClient::new(url, config.request_timeout_ms) {
            Ok(client) => ProviderMode::Proxy(client),
            Err(e) => ProviderMode::Disabled(format!(
                "failed to initialize wallet proxy client: {e}"
            )),
        };
        Self {
            info,
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn require_authorized(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        let g = self.lock_state()?;
        if !g.authorized {
            return Err(PortError::Policy("NO_CONNECTED_ACCOUNT".to_owned()));
        }
        Ok(g)
    }

    pub fn debug_set_accounts(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.lock_state()?.accounts = accounts;
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        self.lock_state()?.chain_id = chain_id;
        Ok(())
    }

    /// Batches recorded by the demo wallet, oldest first.
    pub fn submitted_batches(&self) -> Result<Vec<SubmittedBatch>, PortError> {
        Ok(self.lock_state()?.batches.clone())
    }

    fn deterministic_send_calls(&self, request: &SendCallsRequest) -> Result<CallsId, PortError> {
        let suffix = match &request.data_suffix {
            Some(suffix) => Some(suffix.as_bytes().ok_or_else(|| {
                PortError::Validation(format!(
                    "wallet rejected dataSuffix: not a 0x-prefixed hex string: {:?}",
                    suffix.to_wire()
                ))
            })?),
            None => None,
        };
        if SupportedChain::from_chain_id(request.chain_id).is_none() {
            return Err(PortError::Validation(format!(
                "unsupported chain id {}",
                request.chain_id
            )));
        }

        let mut g = self.require_authorized()?;
        let from = match request.from {
            Some(from) if g.accounts.contains(&from) => from,
            Some(from) => {
                return Err(PortError::Policy(format!(
                    "account {from} is not authorized by this wallet"
                )))
            }
            None => g
                .accounts
                .first()
                .copied()
                .ok_or_else(|| PortError::Policy("NO_CONNECTED_ACCOUNT".to_owned()))?,
        };

        g.batch_seq = g.batch_seq.saturating_add(1);
        let mut seed = request.to_rpc_params().to_string().into_bytes();
        seed.extend_from_slice(&g.batch_seq.to_be_bytes());
        let id = CallsId(keccak256(seed).to_string());

        let calls = request
            .calls
            .iter()
            .map(|call| Call {
                to: call.to,
                data: match &suffix {
                    Some(suffix) => append_suffix(&call.data, suffix),
                    None => call.data.clone(),
                },
                value: call.value,
            })
            .collect();
        g.chain_id = request.chain_id;
        g.batches.push(SubmittedBatch {
            id: id.clone(),
            chain_id: request.chain_id,
            from,
            calls,
            data_suffix: request.data_suffix.clone(),
            polls: 0,
        });
        Ok(id)
    }

    fn deterministic_calls_status(
        &self,
        id: &CallsId,
        pending_polls: u32,
    ) -> Result<CallBatchStatus, PortError> {
        let mut g = self.lock_state()?;
        let batch = g
            .batches
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| PortError::NotFound(format!("calls id not found: {id}")))?;
        batch.polls = batch.polls.saturating_add(1);
        if batch.polls <= pending_polls {
            return Ok(CallBatchStatus::Pending);
        }
        let mut seed = id.0.as_bytes().to_vec();
        for call in &batch.calls {
            seed.extend_from_slice(&call.data);
        }
        Ok(CallBatchStatus::Included {
            receipts: vec![CallReceipt {
                transaction_hash: keccak256(seed),
            }],
        })
    }
}

impl ProviderPort for Eip1193Adapter {
    fn info(&self) -> ConnectorInfo {
        self.info.clone()
    }

    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(client) => {
                let result = client.call("eth_requestAccounts", json!([]))?;
                let accounts = parse_accounts(&result)?;
                let mut g = self.lock_state()?;
                g.accounts = accounts.clone();
                g.authorized = true;
                Ok(accounts)
            }
            _ => {
                let mut g = self.lock_state()?;
                g.authorized = true;
                Ok(g.accounts.clone())
            }
        }
    }

    fn chain_id(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(client) => {
                let result = client.call("eth_chainId", json!([]))?;
                let chain_id = parse_hex_u64(&result, "eth_chainId result")?;
                self.lock_state()?.chain_id = chain_id;
                Ok(chain_id)
            }
            _ => Ok(self.lock_state()?.chain_id),
        }
    }

    fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(client) => {
                client.call(
                    "wallet_switchEthereumChain",
                    json!([{ "chainId": format!("0x{chain_id:x}") }]),
                )?;
            }
            _ => {
                if SupportedChain::from_chain_id(chain_id).is_none() {
                    return Err(PortError::Validation(format!(
                        "unsupported chain id {chain_id}"
                    )));
                }
            }
        }
        self.lock_state()?.chain_id = chain_id;
        Ok(())
    }

    fn send_calls(&self, request: &SendCallsRequest) -> Result<CallsId, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(client) => {
                let result = client.call("wallet_sendCalls", request.to_rpc_params())?;
                parse_calls_id(&result)
            }
            _ => self.deterministic_send_calls(request),
        }
    }

    fn get_calls_status(&self, id: &CallsId) -> Result<CallBatchStatus, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(client) => {
                let result = client.call("wallet_getCallsStatus", json!([id.0]))?;
                parse_calls_status(&result)
            }
            ProviderMode::Deterministic { pending_polls } => {
                self.deterministic_calls_status(id, *pending_polls)
            }
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
        }
    }

    fn disconnect(&self) -> Result<(), PortError> {
        if let ProviderMode::Proxy(client) = &self.mode {
            if let Err(e) = client.call(
                "wallet_revokePermissions",
                json!([{ "eth_accounts": {} }]),
            ) {
                tracing::warn!(error = %e, "wallet_revokePermissions failed, disconnecting locally");
            }
        }
        self.lock_state()?.authorized = false;
        Ok(())
    }
}

fn parse_accounts(result: &Value) -> Result<Vec<Address>, PortError> {
    let arr = result.as_array().ok_or_else(|| {
        PortError::Transport("eth_requestAccounts result must be array".to_owned())
    })?;
    arr.iter()
        .map(|item| {
            let raw = item.as_str().ok_or_else(|| {
                PortError::Transport("eth_requestAccounts item must be string".to_owned())
            })?;
            raw.parse::<Address>()
                .map_err(|e| PortError::Validation(format!("invalid account {raw}: {e}")))
        })
        .collect()
}

/// EIP-5792 v2 returns `{ "id": ... }`, older wallets a bare string.
fn parse_calls_id(result: &Value) -> Result<CallsId, PortError> {
    let id = match result {
        Value::String(id) => id.clone(),
        Value::Object(map) => map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| PortError::Transport("wallet_sendCalls result missing id".to_owned()))?,
        other => {
            return Err(PortError::Transport(format!(
                "unexpected wallet_sendCalls result: {other}"
            )))
        }
    };
    Ok(CallsId(id))
}

fn parse_calls_status(result: &Value) -> Result<CallBatchStatus, PortError> {
    let receipts = result
        .get("receipts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|r| r.get("transactionHash").and_then(Value::as_str))
                .map(|hash| {
                    hash.parse::<B256>()
                        .map(|transaction_hash| CallReceipt { transaction_hash })
                        .map_err(|e| {
                            PortError::Transport(format!("invalid transactionHash {hash}: {e}"))
                        })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let code = match result.get("status") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| PortError::Transport(format!("invalid status code {n}")))?,
        // Pre-v2 wallets report a string status.
        Some(Value::String(s)) => match s.to_ascii_uppercase().as_str() {
            "PENDING" => 100,
            "CONFIRMED" => 200,
            other => {
                return Err(PortError::Transport(format!(
                    "unknown calls status {other}"
                )))
            }
        },
        _ => {
            return Err(PortError::Transport(
                "wallet_getCallsStatus result missing status".to_owned(),
            ))
        }
    };
    Ok(CallBatchStatus::from_status_code(code, receipts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v1_and_v2_send_calls_results() {
        assert_eq!(
            parse_calls_id(&json!("0xabc")).expect("v1"),
            CallsId("0xabc".to_owned())
        );
        assert_eq!(
            parse_calls_id(&json!({ "id": "0xdef" })).expect("v2"),
            CallsId("0xdef".to_owned())
        );
        assert!(parse_calls_id(&json!(42)).is_err());
    }

    #[test]
    fn parses_numeric_and_string_statuses() {
        let hash = format!("0x{}", "ab".repeat(32));
        let status = parse_calls_status(&json!({
            "status": 200,
            "receipts": [{ "transactionHash": hash }]
        }))
        .expect("v2 status");
        assert!(status.first_transaction_hash().is_some());

        let pending = parse_calls_status(&json!({ "status": "PENDING" })).expect("v1 status");
        assert_eq!(pending, CallBatchStatus::Pending);

        assert!(parse_calls_status(&json!({})).is_err());
    }
}
