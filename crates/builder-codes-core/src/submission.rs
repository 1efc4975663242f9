//! Call submission flow: form state, batch assembly and inclusion tracking.

use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::attribution::{self, AttributionError};
use crate::domain::{Call, CallBatchStatus, CallReceipt, CallsId, DataSuffix, SupportedChain};
use crate::state_machine::{
    submission_transition, StateTransition, SubmissionAction, SubmissionStatus, TransitionError,
};

alloy::sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

pub const SEND_CALLS_VERSION: &str = "2.0.0";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Attribution(#[from] AttributionError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("invalid recipient {input:?}: {reason}")]
    InvalidRecipient { input: String, reason: String },
    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },
    #[error("wallet is not connected")]
    NotConnected,
}

/// Which attribution the user picked in the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributionMode {
    #[default]
    None,
    Canonical,
    Custom,
    Malformed,
}

impl AttributionMode {
    pub const ALL: [AttributionMode; 4] = [
        AttributionMode::None,
        AttributionMode::Canonical,
        AttributionMode::Custom,
        AttributionMode::Malformed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AttributionMode::None => "None",
            AttributionMode::Canonical => "Canonical Registry (Schema 0)",
            AttributionMode::Custom => "Custom Registry (Schema 1)",
            AttributionMode::Malformed => "Malformed",
        }
    }
}

/// Attribution resolved from the form, ready to become a `dataSuffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributionChoice {
    None,
    Canonical { code: String },
    Custom { code: String, registry: String },
    RawSuffix { raw: String },
}

impl AttributionChoice {
    /// `RawSuffix` is passed through untouched, even when it is not hex.
    pub fn resolve(&self) -> Result<Option<DataSuffix>, AttributionError> {
        match self {
            AttributionChoice::None => Ok(None),
            AttributionChoice::Canonical { code } => {
                let bytes = attribution::encode(&[code.as_str()], None)?;
                Ok(Some(DataSuffix::Encoded(bytes)))
            }
            AttributionChoice::Custom { code, registry } => {
                let registry = attribution::parse_registry(registry)?;
                let bytes = attribution::encode(&[code.as_str()], Some(registry))?;
                Ok(Some(DataSuffix::Encoded(bytes)))
            }
            AttributionChoice::RawSuffix { raw } => Ok(Some(DataSuffix::Raw(raw.clone()))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallVariant {
    /// Zero-value call to the zero address with empty data.
    #[default]
    NoOp,
    /// ERC-20 `transfer` against the chain's token contract.
    TokenTransfer,
}

impl CallVariant {
    pub fn label(self) -> &'static str {
        match self {
            CallVariant::NoOp => "No-op call",
            CallVariant::TokenTransfer => "Base Pay (USDC transfer)",
        }
    }
}

pub fn token_transfer_call(
    chain: SupportedChain,
    recipient: Address,
    amount: U256,
) -> Call {
    let data = transferCall {
        to: recipient,
        amount,
    }
    .abi_encode();
    Call {
        to: chain.token_address(),
        data: Bytes::from(data),
        value: U256::ZERO,
    }
}

/// Parses a decimal token amount such as `1.25` into base units.
pub fn parse_token_amount(input: &str, decimals: u8) -> Result<U256, FlowError> {
    let trimmed = input.trim();
    let invalid = |reason: String| FlowError::InvalidAmount {
        input: input.to_owned(),
        reason,
    };
    if trimmed.is_empty() {
        return Err(invalid("amount is required".to_owned()));
    }
    // parse_units truncates extra fraction digits instead of failing.
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > usize::from(decimals) {
            return Err(invalid(format!("at most {decimals} decimal places")));
        }
    }
    match parse_units(trimmed, decimals).map_err(|e| invalid(e.to_string()))? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(invalid("amount must not be negative".to_owned())),
    }
}

/// One `wallet_sendCalls` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCallsRequest {
    pub chain_id: u64,
    pub from: Option<Address>,
    pub calls: Vec<Call>,
    pub data_suffix: Option<DataSuffix>,
}

impl SendCallsRequest {
    /// EIP-5792 `wallet_sendCalls` params.
    pub fn to_rpc_params(&self) -> Value {
        let calls: Vec<Value> = self
            .calls
            .iter()
            .map(|call| {
                json!({
                    "to": call.to,
                    "data": call.data,
                    "value": format!("0x{:x}", call.value),
                })
            })
            .collect();
        let mut request = json!({
            "version": SEND_CALLS_VERSION,
            "chainId": format!("0x{:x}", self.chain_id),
            "atomicRequired": false,
            "calls": calls,
        });
        if let Some(from) = self.from {
            request["from"] = json!(from);
        }
        if let Some(suffix) = &self.data_suffix {
            request["capabilities"] = json!({ "dataSuffix": suffix });
        }
        json!([request])
    }
}

/// Raw form fields. Fields for modes other than the selected one may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCallsForm {
    pub chain: SupportedChain,
    pub mode: AttributionMode,
    pub builder_code: String,
    pub registry_address: String,
    pub raw_suffix: String,
    pub variant: CallVariant,
    pub recipient: String,
    pub amount: String,
}

impl Default for SendCallsForm {
    fn default() -> Self {
        Self {
            chain: SupportedChain::BaseSepolia,
            mode: AttributionMode::None,
            builder_code: String::new(),
            registry_address: String::new(),
            raw_suffix: String::new(),
            variant: CallVariant::NoOp,
            recipient: String::new(),
            amount: "0.01".to_owned(),
        }
    }
}

impl SendCallsForm {
    pub fn attribution_choice(&self) -> AttributionChoice {
        match self.mode {
            AttributionMode::None => AttributionChoice::None,
            AttributionMode::Canonical => AttributionChoice::Canonical {
                code: self.builder_code.clone(),
            },
            AttributionMode::Custom => AttributionChoice::Custom {
                code: self.builder_code.clone(),
                registry: self.registry_address.clone(),
            },
            AttributionMode::Malformed => AttributionChoice::RawSuffix {
                raw: self.raw_suffix.clone(),
            },
        }
    }

    pub fn call(&self) -> Result<Call, FlowError> {
        match self.variant {
            CallVariant::NoOp => Ok(Call::noop()),
            CallVariant::TokenTransfer => {
                let recipient = self.recipient.trim().parse::<Address>().map_err(|e| {
                    FlowError::InvalidRecipient {
                        input: self.recipient.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let amount = parse_token_amount(&self.amount, self.chain.token_decimals())?;
                Ok(token_transfer_call(self.chain, recipient, amount))
            }
        }
    }

    /// Exactly one batch holding exactly one call.
    pub fn build_request(&self, from: Option<Address>) -> Result<SendCallsRequest, FlowError> {
        let call = self.call()?;
        let data_suffix = self.attribution_choice().resolve()?;
        Ok(SendCallsRequest {
            chain_id: self.chain.chain_id(),
            from,
            calls: vec![call],
            data_suffix,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEdit {
    Chain(SupportedChain),
    Mode(AttributionMode),
    BuilderCode(String),
    RegistryAddress(String),
    RawSuffix(String),
    Variant(CallVariant),
    Recipient(String),
    Amount(String),
}

/// State of the "Send Calls" panel, advanced only through its methods.
#[derive(Debug, Clone)]
pub struct SendCallsFlow {
    form: SendCallsForm,
    status: SubmissionStatus,
    submitted_chain: Option<SupportedChain>,
    calls_id: Option<CallsId>,
    receipts: Vec<CallReceipt>,
    last_error: Option<String>,
    transitions: Vec<StateTransition<SubmissionStatus>>,
}

impl Default for SendCallsFlow {
    fn default() -> Self {
        Self::new(SendCallsForm::default())
    }
}

impl SendCallsFlow {
    pub fn new(form: SendCallsForm) -> Self {
        Self {
            form,
            status: SubmissionStatus::Idle,
            submitted_chain: None,
            calls_id: None,
            receipts: Vec::new(),
            last_error: None,
            transitions: Vec::new(),
        }
    }

    pub fn form(&self) -> &SendCallsForm {
        &self.form
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn calls_id(&self) -> Option<&CallsId> {
        self.calls_id.as_ref()
    }

    pub fn receipts(&self) -> &[CallReceipt] {
        &self.receipts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn transitions(&self) -> &[StateTransition<SubmissionStatus>] {
        &self.transitions
    }

    fn apply(&mut self, action: SubmissionAction) -> Result<(), TransitionError> {
        let (to, transition) = submission_transition(self.status, action)?;
        self.status = to;
        self.transitions.push(transition);
        Ok(())
    }

    pub fn edit(&mut self, edit: FlowEdit) {
        match edit {
            FlowEdit::Chain(chain) => self.form.chain = chain,
            FlowEdit::Mode(mode) => self.form.mode = mode,
            FlowEdit::BuilderCode(v) => self.form.builder_code = v,
            FlowEdit::RegistryAddress(v) => self.form.registry_address = v,
            FlowEdit::RawSuffix(v) => self.form.raw_suffix = v,
            FlowEdit::Variant(v) => self.form.variant = v,
            FlowEdit::Recipient(v) => self.form.recipient = v,
            FlowEdit::Amount(v) => self.form.amount = v,
        }
        // Edit is legal from every status.
        let _ = self.apply(SubmissionAction::Edit);
    }

    /// Builds the batch and moves to `Submitting`. The caller sends the request.
    pub fn begin_submit(&mut self, from: Option<Address>) -> Result<SendCallsRequest, FlowError> {
        if self.status.is_in_flight() {
            return Err(TransitionError::Submission {
                from: self.status,
                action: SubmissionAction::Submit,
            }
            .into());
        }
        let request = match self.form.build_request(from) {
            Ok(request) => request,
            Err(e) => {
                self.calls_id = None;
                self.receipts.clear();
                self.submitted_chain = None;
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        self.apply(SubmissionAction::Submit)?;
        self.submitted_chain = Some(self.form.chain);
        self.calls_id = None;
        self.receipts.clear();
        self.last_error = None;
        Ok(request)
    }

    pub fn on_submitted(&mut self, result: Result<CallsId, String>) {
        if self.status != SubmissionStatus::Submitting {
            return;
        }
        let applied = match result {
            Ok(id) => {
                self.calls_id = Some(id);
                self.apply(SubmissionAction::Accepted)
            }
            Err(message) => {
                self.last_error = Some(message);
                self.apply(SubmissionAction::Rejected)
            }
        };
        debug_assert!(applied.is_ok());
    }

    /// True while a calls id exists and no receipt has arrived yet.
    pub fn should_poll(&self) -> bool {
        self.status == SubmissionStatus::Pending
            && self.calls_id.is_some()
            && self.receipts.is_empty()
    }

    /// Applies a poll result; results for another calls id are ignored.
    pub fn on_status(&mut self, id: &CallsId, result: Result<CallBatchStatus, String>) {
        if self.calls_id.as_ref() != Some(id) || !self.should_poll() {
            return;
        }
        let applied = match result {
            Ok(CallBatchStatus::Pending) => self.apply(SubmissionAction::PollPending),
            Ok(CallBatchStatus::Included { receipts }) if receipts.is_empty() => {
                self.apply(SubmissionAction::PollPending)
            }
            Ok(CallBatchStatus::Included { receipts }) => {
                self.receipts = receipts;
                self.apply(SubmissionAction::Included)
            }
            Ok(CallBatchStatus::Failed { code }) => {
                self.last_error = Some(format!("wallet reported batch failure (status {code})"));
                self.apply(SubmissionAction::BatchFailed)
            }
            Err(message) => {
                self.last_error = Some(message);
                self.apply(SubmissionAction::Rejected)
            }
        };
        debug_assert!(applied.is_ok());
    }

    pub fn transaction_hash(&self) -> Option<alloy::primitives::B256> {
        self.receipts.first().map(|r| r.transaction_hash)
    }

    /// Explorer link on the chain the batch was submitted to.
    pub fn explorer_link(&self) -> Option<String> {
        let chain = self.submitted_chain?;
        let hash = self.transaction_hash()?;
        Some(chain.explorer_tx_url(&hash))
    }

    pub fn reset(&mut self) {
        let _ = self.apply(SubmissionAction::Reset);
        self.submitted_chain = None;
        self.calls_id = None;
        self.receipts.clear();
        self.last_error = None;
    }
}
