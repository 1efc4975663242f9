//! Bridge between the egui shell and the wallet session.
//! The shell only sees strings for errors; typed errors stay in the crates.

use std::sync::Arc;

use builder_codes_adapters::{AppConfig, WalletSession};
use builder_codes_core::{
    CallBatchStatus, CallsId, Connection, ConnectorInfo, PortError, SendCallsRequest,
    SupportedChain, TransportPort,
};

#[derive(Clone)]
pub struct WalletBridge {
    session: Arc<WalletSession>,
}

impl WalletBridge {
    pub fn new(session: WalletSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PortError> {
        Ok(Self::new(WalletSession::from_config(config)?))
    }

    pub fn connectors(&self) -> Vec<ConnectorInfo> {
        self.session.connectors()
    }

    pub fn connection(&self) -> Connection {
        self.session.connection().unwrap_or_default()
    }

    pub fn connect(&self, uid: &str) -> Result<Connection, String> {
        self.session.connect(uid).map_err(|e| e.to_string())
    }

    pub fn reconnect(&self) -> Result<Connection, String> {
        self.session.reconnect().map_err(|e| e.to_string())
    }

    pub fn disconnect(&self) -> Result<Connection, String> {
        self.session.disconnect().map_err(|e| e.to_string())
    }

    pub fn send_calls(&self, request: &SendCallsRequest) -> Result<CallsId, String> {
        self.session.send_calls(request).map_err(|e| e.to_string())
    }

    pub fn calls_status(&self, id: &CallsId) -> Result<CallBatchStatus, String> {
        self.session.calls_status(id).map_err(|e| e.to_string())
    }

    pub fn block_number(&self, chain: SupportedChain) -> Result<u64, String> {
        let transport = self
            .session
            .transport(chain)
            .ok_or_else(|| format!("no transport configured for {chain}"))?;
        transport.block_number().map_err(|e| e.to_string())
    }
}
