mod common;

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use builder_codes_adapters::{AppConfig, CookieJar, HttpTransport, PROXY_CONNECTOR_UID};
use builder_codes_core::{
    AttributionMode, ConnectionStatus, FlowEdit, PortError, SendCallsFlow, SubmissionStatus,
    SupportedChain, TransportPort,
};

use common::{methods, session_with_jar, spawn_rpc_server};

const TX_HASH: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ACCOUNT: &str = "0x1000000000000000000000000000000000000001";

fn wallet_handler(method: &str, _params: &Value) -> Result<Value, String> {
    match method {
        "eth_requestAccounts" => Ok(json!([ACCOUNT])),
        "eth_chainId" => Ok(json!("0x14a34")),
        "wallet_switchEthereumChain" => Ok(Value::Null),
        "wallet_sendCalls" => Ok(json!({ "id": "0xbatch01" })),
        "wallet_getCallsStatus" => Ok(json!({
            "version": "2.0.0",
            "id": "0xbatch01",
            "chainId": "0x14a34",
            "atomic": false,
            "status": 200,
            "receipts": [{ "transactionHash": TX_HASH, "status": "0x1" }]
        })),
        "wallet_revokePermissions" => Err("method not supported".to_owned()),
        other => Err(format!("unexpected method {other}")),
    }
}

fn proxy_config(url: String) -> AppConfig {
    AppConfig {
        wallet_proxy_url: Some(url),
        demo_wallet_enabled: false,
        request_timeout_ms: 5_000,
        ..AppConfig::default()
    }
}

#[test]
fn proxy_wallet_round_trip_carries_data_suffix_capability() {
    let (url, log) = spawn_rpc_server(wallet_handler);
    let session = session_with_jar(&proxy_config(url), &CookieJar::memory());

    let connectors = session.connectors();
    assert_eq!(connectors.len(), 1);
    assert_eq!(connectors[0].uid, PROXY_CONNECTOR_UID);
    assert_eq!(connectors[0].name, "Base Account");

    let conn = session.connect(PROXY_CONNECTOR_UID).expect("connect proxy");
    assert_eq!(conn.chain_id, Some(84532));
    assert_eq!(
        conn.primary_address().expect("account").to_string(),
        ACCOUNT
    );

    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Mode(AttributionMode::Canonical));
    flow.edit(FlowEdit::BuilderCode("baseapp".to_owned()));
    let request = flow.begin_submit(conn.primary_address()).expect("request");
    let id = session.send_calls(&request).expect("send calls");
    assert_eq!(id.0, "0xbatch01");
    flow.on_submitted(Ok(id.clone()));

    let status = session.calls_status(&id).map_err(|e| e.to_string());
    flow.on_status(&id, status);
    assert_eq!(flow.status(), SubmissionStatus::Included);
    assert_eq!(
        flow.explorer_link().expect("explorer link"),
        format!("https://sepolia.basescan.org/tx/{TX_HASH}")
    );

    let calls = log.lock().expect("rpc log lock").clone();
    let send = calls
        .iter()
        .find(|c| c.method == "wallet_sendCalls")
        .expect("wallet_sendCalls recorded");
    let params = &send.params[0];
    assert_eq!(params["version"], "2.0.0");
    assert_eq!(params["chainId"], "0x14a34");
    assert_eq!(params["atomicRequired"], false);
    assert_eq!(params["calls"].as_array().expect("calls").len(), 1);
    assert_eq!(
        params["capabilities"]["dataSuffix"],
        "0x62617365617070070080218021802180218021802180218021"
    );

    let status_call = calls
        .iter()
        .find(|c| c.method == "wallet_getCallsStatus")
        .expect("status recorded");
    assert_eq!(status_call.params, json!(["0xbatch01"]));
}

#[test]
fn proxy_switches_chain_before_sending() {
    let (url, log) = spawn_rpc_server(wallet_handler);
    let session = session_with_jar(&proxy_config(url), &CookieJar::memory());
    session.connect(PROXY_CONNECTOR_UID).expect("connect");

    let mut flow = SendCallsFlow::default();
    flow.edit(FlowEdit::Chain(SupportedChain::Base));
    let request = flow.begin_submit(None).expect("request");
    session.send_calls(&request).expect("send calls");

    let seen = methods(&log);
    let switch = seen
        .iter()
        .position(|m| m == "wallet_switchEthereumChain")
        .expect("switch recorded");
    let send = seen
        .iter()
        .position(|m| m == "wallet_sendCalls")
        .expect("send recorded");
    assert!(switch < send);

    let calls = log.lock().expect("rpc log lock").clone();
    assert_eq!(calls[switch].params, json!([{ "chainId": "0x2105" }]));
    assert_eq!(session.connection().expect("connection").chain_id, Some(8453));
}

#[test]
fn wallet_rejection_surfaces_as_failed_submission() {
    let (url, _log) = spawn_rpc_server(|method, params| match method {
        "wallet_sendCalls" => Err("User rejected the request.".to_owned()),
        other => wallet_handler(other, params),
    });
    let session = session_with_jar(&proxy_config(url), &CookieJar::memory());
    session.connect(PROXY_CONNECTOR_UID).expect("connect");

    let mut flow = SendCallsFlow::default();
    let request = flow.begin_submit(None).expect("request");
    let err = session.send_calls(&request).expect_err("rejected");
    assert!(matches!(err, PortError::Transport(_)));
    flow.on_submitted(Err(err.to_string()));
    assert_eq!(flow.status(), SubmissionStatus::Failed);
    assert!(flow
        .last_error()
        .expect("error")
        .contains("User rejected the request."));
}

#[test]
fn wallet_error_survives_disconnect_during_connect() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let (url, _log) = spawn_rpc_server(move |method, params| match method {
        "eth_requestAccounts" => {
            if let Ok(rx) = release_rx.lock() {
                let _ = rx.recv_timeout(Duration::from_secs(5));
            }
            Err("User rejected the request.".to_owned())
        }
        other => wallet_handler(other, params),
    });
    let session = Arc::new(session_with_jar(&proxy_config(url), &CookieJar::memory()));

    let connecting = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.connect(PROXY_CONNECTOR_UID))
    };
    for _ in 0..200 {
        if session.connection().expect("connection").status == ConnectionStatus::Connecting {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    session.disconnect().expect("disconnect while connecting");
    release_tx.send(()).expect("release wallet");

    let err = connecting
        .join()
        .expect("connect thread")
        .expect_err("wallet rejected");
    assert!(matches!(err, PortError::Transport(_)));
    assert!(err.to_string().contains("User rejected the request."));
    let conn = session.connection().expect("connection");
    assert_eq!(conn.status, ConnectionStatus::Disconnected);
}

#[test]
fn revoke_failure_still_disconnects_locally() {
    let (url, log) = spawn_rpc_server(wallet_handler);
    let session = session_with_jar(&proxy_config(url), &CookieJar::memory());
    session.connect(PROXY_CONNECTOR_UID).expect("connect");

    let conn = session.disconnect().expect("disconnect");
    assert!(!conn.is_connected());
    assert!(methods(&log).iter().any(|m| m == "wallet_revokePermissions"));
}

#[test]
fn http_transport_reads_block_number() {
    let (url, log) = spawn_rpc_server(|method, _| match method {
        "eth_blockNumber" => Ok(json!("0x1b4")),
        other => Err(format!("unexpected method {other}")),
    });
    let transport =
        HttpTransport::new(SupportedChain::BaseSepolia, &url, 5_000).expect("transport");
    assert_eq!(transport.block_number().expect("block number"), 436);
    assert_eq!(transport.url(), url);
    assert_eq!(methods(&log), vec!["eth_blockNumber".to_owned()]);
}

#[test]
fn malformed_block_number_names_the_chain() {
    let (url, _log) = spawn_rpc_server(|_, _| Ok(json!(436)));
    let transport = HttpTransport::new(SupportedChain::Sepolia, &url, 5_000).expect("transport");
    let err = transport.block_number().expect_err("number is not hex");
    assert!(matches!(err, PortError::Transport(_)));
    assert!(err.to_string().contains(SupportedChain::Sepolia.name()));
}

#[test]
fn rpc_override_replaces_public_endpoint() {
    let (url, _log) = spawn_rpc_server(|_, _| Ok(json!("0x10")));
    let mut config = AppConfig::default();
    config
        .rpc_overrides
        .insert(SupportedChain::Sepolia, url.clone());
    let session = session_with_jar(&config, &CookieJar::memory());

    let transport = session.transport(SupportedChain::Sepolia).expect("transport");
    assert_eq!(transport.url(), url);
    assert_eq!(transport.block_number().expect("block"), 16);
    assert_eq!(
        session.transport(SupportedChain::Base).expect("base").url(),
        SupportedChain::Base.default_rpc_url()
    );
}
