use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::{CallBatchStatus, CallsId, ConnectorInfo, SessionSnapshot};
use crate::submission::SendCallsRequest;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// A wallet connector speaking EIP-1193 / EIP-5792 methods.
pub trait ProviderPort {
    fn info(&self) -> ConnectorInfo;
    fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    fn chain_id(&self) -> Result<u64, PortError>;
    fn switch_chain(&self, chain_id: u64) -> Result<(), PortError>;
    fn send_calls(&self, request: &SendCallsRequest) -> Result<CallsId, PortError>;
    fn get_calls_status(&self, id: &CallsId) -> Result<CallBatchStatus, PortError>;
    fn disconnect(&self) -> Result<(), PortError>;
}

/// Persists the connection snapshot across restarts.
pub trait SessionStorePort {
    fn load(&self) -> Result<Option<SessionSnapshot>, PortError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), PortError>;
    fn clear(&self) -> Result<(), PortError>;
}

/// A network's JSON-RPC endpoint.
pub trait TransportPort {
    fn url(&self) -> &str;
    fn block_number(&self) -> Result<u64, PortError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}
