use alloy::primitives::{hex, Address, Bytes, B256, U256};
use builder_codes_core::attribution::encode;
use builder_codes_core::submission::parse_token_amount;
use builder_codes_core::{
    AttributionChoice, AttributionMode, CallBatchStatus, CallReceipt, CallVariant, CallsId,
    DataSuffix, FlowEdit, FlowError, SendCallsFlow, SubmissionStatus, SupportedChain,
};

fn sender() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid sender")
}

fn tx_hash() -> B256 {
    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        .parse()
        .expect("valid hash")
}

fn included() -> CallBatchStatus {
    CallBatchStatus::Included {
        receipts: vec![CallReceipt {
            transaction_hash: tx_hash(),
        }],
    }
}

#[test]
fn canonical_submission_on_base_sepolia() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Chain(SupportedChain::BaseSepolia));
    flow.edit(FlowEdit::Mode(AttributionMode::Canonical));
    flow.edit(FlowEdit::BuilderCode("abc123".to_owned()));

    let request = flow.begin_submit(Some(sender())).expect("submit");
    assert_eq!(flow.status(), SubmissionStatus::Submitting);
    assert_eq!(request.chain_id, 84532);
    assert_eq!(request.calls.len(), 1);
    assert_eq!(request.calls[0].to, Address::ZERO);
    assert!(request.calls[0].data.is_empty());
    assert_eq!(request.calls[0].value, U256::ZERO);
    assert_eq!(
        request.data_suffix,
        Some(DataSuffix::Encoded(encode(&["abc123"], None).expect("encode")))
    );
}

#[test]
fn none_mode_ignores_stale_fields() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Mode(AttributionMode::Custom));
    flow.edit(FlowEdit::BuilderCode("abc123".to_owned()));
    flow.edit(FlowEdit::RegistryAddress(
        "0x000000000000000000000000000000000000C0DE".to_owned(),
    ));
    flow.edit(FlowEdit::RawSuffix("0xdeadbeef".to_owned()));
    flow.edit(FlowEdit::Mode(AttributionMode::None));

    let request = flow.begin_submit(None).expect("submit");
    assert_eq!(request.data_suffix, None);
    let params = request.to_rpc_params();
    assert!(params[0].get("capabilities").is_none());
}

#[test]
fn malformed_mode_attaches_raw_input_verbatim() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Mode(AttributionMode::Malformed));
    flow.edit(FlowEdit::RawSuffix("not-hex zz".to_owned()));

    let request = flow.begin_submit(None).expect("submit");
    assert_eq!(
        request.data_suffix,
        Some(DataSuffix::Raw("not-hex zz".to_owned()))
    );
    let params = request.to_rpc_params();
    assert_eq!(params[0]["capabilities"]["dataSuffix"], "not-hex zz");
}

#[test]
fn custom_mode_with_empty_registry_surfaces_codec_error() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Mode(AttributionMode::Custom));
    flow.edit(FlowEdit::BuilderCode("abc123".to_owned()));

    let err = flow.begin_submit(None).expect_err("registry required");
    assert!(matches!(err, FlowError::Attribution(_)));
    assert_eq!(flow.status(), SubmissionStatus::Configuring);
    assert!(flow
        .last_error()
        .unwrap_or_default()
        .contains("registry address is required"));
}

#[test]
fn custom_mode_encodes_schema_one() {
    let choice = AttributionChoice::Custom {
        code: "abc123".to_owned(),
        registry: "0x000000000000000000000000000000000000C0DE".to_owned(),
    };
    let suffix = choice.resolve().expect("resolve").expect("suffix");
    let bytes = suffix.as_bytes().expect("bytes");
    let decoded = builder_codes_core::attribution::decode(&bytes).expect("decode");
    assert_eq!(decoded.schema_id(), 1);
}

#[test]
fn rpc_params_follow_wallet_send_calls_shape() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Chain(SupportedChain::Base));
    flow.edit(FlowEdit::Mode(AttributionMode::Canonical));
    flow.edit(FlowEdit::BuilderCode("abc123".to_owned()));
    let request = flow.begin_submit(Some(sender())).expect("submit");

    let params = request.to_rpc_params();
    let body = &params[0];
    assert_eq!(body["version"], "2.0.0");
    assert_eq!(body["chainId"], "0x2105");
    assert_eq!(body["atomicRequired"], false);
    assert_eq!(body["calls"][0]["to"], Address::ZERO.to_string());
    assert_eq!(body["calls"][0]["data"], "0x");
    assert_eq!(body["calls"][0]["value"], "0x0");
    let suffix = encode(&["abc123"], None).expect("encode");
    assert_eq!(
        body["capabilities"]["dataSuffix"],
        hex::encode_prefixed(&suffix)
    );
    assert!(body["from"].as_str().is_some());
}

#[test]
fn token_transfer_targets_chain_token_contract() {
    let recipient = "0x000000000000000000000000000000000000CAFE";
    for chain in SupportedChain::ALL {
        let mut flow = SendCallsFlow::default();
        flow.edit(FlowEdit::Chain(chain));
        flow.edit(FlowEdit::Variant(CallVariant::TokenTransfer));
        flow.edit(FlowEdit::Recipient(recipient.to_owned()));
        flow.edit(FlowEdit::Amount("1.5".to_owned()));

        let request = flow.begin_submit(None).expect("submit");
        let call = &request.calls[0];
        assert_eq!(call.to, chain.token_address());
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(&call.data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(call.data.len(), 4 + 32 + 32);
        let amount = U256::from_be_slice(&call.data[36..68]);
        assert_eq!(amount, U256::from(1_500_000u64));
    }
}

#[test]
fn token_transfer_rejects_bad_inputs() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Variant(CallVariant::TokenTransfer));
    flow.edit(FlowEdit::Recipient("nope".to_owned()));
    assert!(matches!(
        flow.begin_submit(None),
        Err(FlowError::InvalidRecipient { .. })
    ));

    flow.edit(FlowEdit::Recipient(
        "0x000000000000000000000000000000000000CAFE".to_owned(),
    ));
    flow.edit(FlowEdit::Amount("".to_owned()));
    assert!(matches!(
        flow.begin_submit(None),
        Err(FlowError::InvalidAmount { .. })
    ));

    for amount in ["1.1234567", "0.0000001"] {
        flow.edit(FlowEdit::Amount(amount.to_owned()));
        let err = flow.begin_submit(None).expect_err("too many decimals");
        assert!(matches!(err, FlowError::InvalidAmount { .. }));
        assert!(err.to_string().contains("at most 6 decimal places"));
    }
}

#[test]
fn token_amount_keeps_every_allowed_decimal() {
    assert_eq!(
        parse_token_amount("1.123456", 6).expect("amount"),
        U256::from(1_123_456u64)
    );
    assert!(parse_token_amount("1.1234567", 6).is_err());
}

#[test]
fn polling_runs_until_receipt_and_links_to_explorer() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Chain(SupportedChain::BaseSepolia));
    flow.begin_submit(None).expect("submit");
    assert!(!flow.should_poll());

    let id = CallsId("0x01".to_owned());
    flow.on_submitted(Ok(id.clone()));
    assert_eq!(flow.status(), SubmissionStatus::Pending);
    assert!(flow.should_poll());

    flow.on_status(&id, Ok(CallBatchStatus::Pending));
    assert!(flow.should_poll());
    flow.on_status(&id, Ok(CallBatchStatus::Included { receipts: vec![] }));
    assert!(flow.should_poll());

    flow.on_status(&id, Ok(included()));
    assert_eq!(flow.status(), SubmissionStatus::Included);
    assert!(!flow.should_poll());
    assert_eq!(flow.transaction_hash(), Some(tx_hash()));
    assert_eq!(
        flow.explorer_link().expect("link"),
        format!("https://sepolia.basescan.org/tx/{}", tx_hash())
    );
}

#[test]
fn failed_resubmit_drops_previous_outcome() {
    let mut flow = SendCallsFlow::default();
    flow.begin_submit(None).expect("submit");
    let id = CallsId("0x01".to_owned());
    flow.on_submitted(Ok(id.clone()));
    flow.on_status(&id, Ok(included()));
    assert!(flow.explorer_link().is_some());

    flow.edit(FlowEdit::Mode(AttributionMode::Custom));
    flow.edit(FlowEdit::RegistryAddress(String::new()));
    flow.begin_submit(None).expect_err("empty registry");
    assert!(flow.last_error().is_some());
    assert!(flow.calls_id().is_none());
    assert!(flow.receipts().is_empty());
    assert!(flow.explorer_link().is_none());
}

#[test]
fn explorer_link_uses_chain_at_submission_time() {
    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Chain(SupportedChain::Base));
    flow.begin_submit(None).expect("submit");
    let id = CallsId("0x02".to_owned());
    flow.on_submitted(Ok(id.clone()));
    flow.edit(FlowEdit::Chain(SupportedChain::Sepolia));
    assert_eq!(flow.status(), SubmissionStatus::Pending);
    flow.on_status(&id, Ok(included()));
    assert!(flow
        .explorer_link()
        .expect("link")
        .starts_with("https://basescan.org/tx/0x"));
}

#[test]
fn stale_status_for_other_batch_is_ignored() {
    let mut flow = SendCallsFlow::default();
    flow.begin_submit(None).expect("submit");
    let id = CallsId("0x03".to_owned());
    flow.on_submitted(Ok(id));
    flow.on_status(&CallsId("0xother".to_owned()), Ok(included()));
    assert_eq!(flow.status(), SubmissionStatus::Pending);
    assert!(flow.receipts().is_empty());
}

#[test]
fn wallet_rejection_is_terminal_until_resubmitted() {
    let mut flow = SendCallsFlow::default();
    flow.begin_submit(None).expect("submit");
    flow.on_submitted(Err("user rejected".to_owned()));
    assert_eq!(flow.status(), SubmissionStatus::Failed);
    assert_eq!(flow.last_error(), Some("user rejected"));
    assert!(!flow.should_poll());

    flow.begin_submit(None).expect("resubmit");
    assert_eq!(flow.status(), SubmissionStatus::Submitting);
    assert_eq!(flow.last_error(), None);
}

#[test]
fn batch_failure_and_double_submit() {
    let mut flow = SendCallsFlow::default();
    flow.begin_submit(None).expect("submit");
    assert!(matches!(
        flow.begin_submit(None),
        Err(FlowError::Transition(_))
    ));
    let id = CallsId("0x04".to_owned());
    flow.on_submitted(Ok(id.clone()));
    flow.on_status(&id, Ok(CallBatchStatus::Failed { code: 500 }));
    assert_eq!(flow.status(), SubmissionStatus::Failed);
    assert!(flow.last_error().unwrap_or_default().contains("500"));

    flow.reset();
    assert_eq!(flow.status(), SubmissionStatus::Idle);
    assert!(flow.calls_id().is_none());
    assert_eq!(flow.transitions().last().map(|t| t.reason), Some("reset"));
}

#[test]
fn data_suffix_wire_format() {
    let encoded = DataSuffix::Encoded(Bytes::from(vec![0x12, 0x34]));
    assert_eq!(encoded.to_wire(), "0x1234");
    assert_eq!(DataSuffix::from_wire("0x1234"), encoded);
    assert_eq!(
        DataSuffix::from_wire("0x123"),
        DataSuffix::Raw("0x123".to_owned())
    );
    assert_eq!(DataSuffix::Raw("zz".to_owned()).as_bytes(), None);
}
