#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use alloy::primitives::Address;
use serde_json::{json, Value};
use tiny_http::{Response, Server};

use builder_codes_adapters::{
    discover_connectors, transports, AppConfig, CookieJar, CookieStorage, SystemClockAdapter,
    WalletSession,
};
use builder_codes_core::{ClockPort, PortError};

pub const T0_MS: u64 = 1_739_750_400_000;

#[derive(Debug, Clone)]
pub struct FixedClock(pub u64);

impl ClockPort for FixedClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.0)
    }
}

pub fn demo_config() -> AppConfig {
    AppConfig {
        demo_pending_polls: 1,
        ..AppConfig::default()
    }
}

pub fn memory_storage(jar: &CookieJar, config: &AppConfig) -> CookieStorage {
    CookieStorage::new(jar.clone(), config.cookie_max_age_secs, SystemClockAdapter)
}

/// A session over an in-memory cookie jar that callers can share.
pub fn session_with_jar(config: &AppConfig, jar: &CookieJar) -> WalletSession {
    WalletSession::new(
        discover_connectors(config),
        transports(config).expect("build transports"),
        memory_storage(jar, config),
    )
}

pub fn demo_session() -> WalletSession {
    session_with_jar(&demo_config(), &CookieJar::memory())
}

pub fn demo_account() -> Address {
    Address::with_last_byte(1)
}

pub fn recipient() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid recipient")
}

/// One JSON-RPC call as the mock server saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

pub type RpcLog = Arc<Mutex<Vec<RecordedCall>>>;

/// Serves JSON-RPC 2.0; `handler` maps (method, params) to a result or an
/// error message. Each request is answered on its own thread so a handler
/// may block without stalling later calls. Calls are logged in arrival order.
pub fn spawn_rpc_server<F>(handler: F) -> (String, RpcLog)
where
    F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());
    let log: RpcLog = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::clone(&log);
    let handler = Arc::new(handler);

    thread::spawn(move || {
        for _ in 0..64 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let method = payload
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let params = payload.get("params").cloned().unwrap_or(Value::Null);
            if let Ok(mut g) = calls.lock() {
                g.push(RecordedCall {
                    method: method.clone(),
                    params: params.clone(),
                });
            }

            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let id = payload.get("id").cloned().unwrap_or(Value::Null);
                let reply = match handler(&method, &params) {
                    Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                    Err(message) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": 4001, "message": message }
                    }),
                };
                let _ = req.respond(Response::from_string(reply.to_string()));
            });
        }
    });

    (addr, log)
}

pub fn methods(log: &RpcLog) -> Vec<String> {
    log.lock()
        .expect("rpc log lock")
        .iter()
        .map(|c| c.method.clone())
        .collect()
}
