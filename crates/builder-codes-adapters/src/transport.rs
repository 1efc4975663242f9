use std::collections::BTreeMap;

use serde_json::json;

use builder_codes_core::{PortError, SupportedChain, TransportPort};

use crate::rpc::{parse_hex_u64, JsonRpcClient};
use crate::AppConfig;

/// HTTP JSON-RPC transport for one supported network.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    chain: SupportedChain,
    client: JsonRpcClient,
}

impl HttpTransport {
    pub fn new(chain: SupportedChain, url: &str, timeout_ms: u64) -> Result<Self, PortError> {
        Ok(Self {
            chain,
            client: JsonRpcClient::new(url, timeout_ms)?,
        })
    }
}

impl TransportPort for HttpTransport {
    fn url(&self) -> &str {
        self.client.url()
    }

    fn block_number(&self) -> Result<u64, PortError> {
        let result = self.client.call("eth_blockNumber", json!([]))?;
        parse_hex_u64(
            &result,
            &format!("eth_blockNumber result on {}", self.chain.name()),
        )
    }
}

/// One transport per supported chain. Overrides from config win over the
/// public endpoints.
pub fn transports(config: &AppConfig) -> Result<BTreeMap<SupportedChain, HttpTransport>, PortError> {
    SupportedChain::ALL
        .into_iter()
        .map(|chain| {
            let url = config.rpc_url(chain);
            HttpTransport::new(chain, &url, config.request_timeout_ms).map(|t| (chain, t))
        })
        .collect()
}
