use std::fmt;

use alloy::primitives::{address, hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Networks the demo can connect to and submit against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SupportedChain {
    Base,
    BaseSepolia,
    Sepolia,
}

impl SupportedChain {
    pub const ALL: [SupportedChain; 3] = [
        SupportedChain::Base,
        SupportedChain::BaseSepolia,
        SupportedChain::Sepolia,
    ];

    pub fn chain_id(self) -> u64 {
        match self {
            SupportedChain::Base => 8453,
            SupportedChain::BaseSepolia => 84532,
            SupportedChain::Sepolia => 11_155_111,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.chain_id() == chain_id)
    }

    pub fn name(self) -> &'static str {
        match self {
            SupportedChain::Base => "Base",
            SupportedChain::BaseSepolia => "Base Sepolia",
            SupportedChain::Sepolia => "Sepolia",
        }
    }

    pub fn is_testnet(self) -> bool {
        !matches!(self, SupportedChain::Base)
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            SupportedChain::Base => "https://mainnet.base.org",
            SupportedChain::BaseSepolia => "https://sepolia.base.org",
            SupportedChain::Sepolia => "https://sepolia.drpc.org",
        }
    }

    /// Explorer transaction URL with a `{hash}` placeholder.
    pub fn explorer_tx_template(self) -> &'static str {
        match self {
            SupportedChain::Base => "https://basescan.org/tx/{hash}",
            SupportedChain::BaseSepolia => "https://sepolia.basescan.org/tx/{hash}",
            SupportedChain::Sepolia => "https://sepolia.etherscan.io/tx/{hash}",
        }
    }

    pub fn explorer_tx_url(self, tx_hash: &B256) -> String {
        self.explorer_tx_template()
            .replace("{hash}", &tx_hash.to_string())
    }

    /// USDC contract used by the token transfer variant.
    pub fn token_address(self) -> Address {
        match self {
            SupportedChain::Base => address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            SupportedChain::BaseSepolia => address!("036cbd53842c5426634e7929541ec2318f3dcf7e"),
            SupportedChain::Sepolia => address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
        }
    }

    pub fn token_symbol(self) -> &'static str {
        "USDC"
    }

    pub fn token_decimals(self) -> u8 {
        6
    }
}

impl fmt::Display for SupportedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub status: ConnectionStatus,
    pub addresses: Vec<Address>,
    pub chain_id: Option<u64>,
    pub connector_uid: Option<String>,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn primary_address(&self) -> Option<Address> {
        self.addresses.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Call {
    pub fn noop() -> Self {
        Self {
            to: Address::ZERO,
            data: Bytes::new(),
            value: U256::ZERO,
        }
    }
}

/// Trailing bytes attached to a submission through the `dataSuffix` capability.
///
/// `Raw` carries user text that has never been validated; it is forwarded to
/// the wallet exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSuffix {
    Encoded(Bytes),
    Raw(String),
}

impl DataSuffix {
    pub fn to_wire(&self) -> String {
        match self {
            DataSuffix::Encoded(bytes) => hex::encode_prefixed(bytes),
            DataSuffix::Raw(raw) => raw.clone(),
        }
    }

    pub fn from_wire(value: &str) -> Self {
        let digits = value.strip_prefix("0x").unwrap_or(value);
        if value.starts_with("0x") && digits.len() % 2 == 0 {
            if let Ok(bytes) = hex::decode(digits) {
                return DataSuffix::Encoded(Bytes::from(bytes));
            }
        }
        DataSuffix::Raw(value.to_owned())
    }

    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            DataSuffix::Encoded(bytes) => Some(bytes.clone()),
            DataSuffix::Raw(raw) => {
                let digits = raw.strip_prefix("0x")?;
                hex::decode(digits).ok().map(Bytes::from)
            }
        }
    }
}

impl Serialize for DataSuffix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for DataSuffix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(DataSuffix::from_wire(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallsId(pub String);

impl fmt::Display for CallsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    pub transaction_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallBatchStatus {
    Pending,
    Included { receipts: Vec<CallReceipt> },
    Failed { code: u16 },
}

impl CallBatchStatus {
    /// Maps an EIP-5792 `wallet_getCallsStatus` status code.
    pub fn from_status_code(code: u16, receipts: Vec<CallReceipt>) -> Self {
        match code {
            100..=199 => CallBatchStatus::Pending,
            200..=299 => CallBatchStatus::Included { receipts },
            _ => CallBatchStatus::Failed { code },
        }
    }

    pub fn first_transaction_hash(&self) -> Option<B256> {
        match self {
            CallBatchStatus::Included { receipts } => {
                receipts.first().map(|r| r.transaction_hash)
            }
            _ => None,
        }
    }
}

/// What survives a restart: enough to reconnect the same connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub connector_uid: String,
    pub chain_id: Option<u64>,
    pub addresses: Vec<Address>,
    pub status: ConnectionStatus,
}

impl SessionSnapshot {
    pub fn from_connection(connection: &Connection) -> Option<Self> {
        Some(Self {
            connector_uid: connection.connector_uid.clone()?,
            chain_id: connection.chain_id,
            addresses: connection.addresses.clone(),
            status: connection.status,
        })
    }
}
