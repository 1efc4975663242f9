use std::collections::BTreeMap;
use std::path::PathBuf;

use builder_codes_core::SupportedChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Development,
    Production,
}

impl RuntimeProfile {
    fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RuntimeProfile::Production,
            _ => RuntimeProfile::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub runtime_profile: RuntimeProfile,
    pub wallet_proxy_url: Option<String>,
    pub connector_name: String,
    pub demo_wallet_enabled: bool,
    /// Polls answered with "pending" before the demo wallet reports inclusion.
    pub demo_pending_polls: u32,
    pub rpc_overrides: BTreeMap<SupportedChain, String>,
    pub request_timeout_ms: u64,
    pub status_poll_interval_ms: u64,
    /// `None` keeps the session cookie in memory only.
    pub cookie_path: Option<PathBuf>,
    pub cookie_max_age_secs: u64,
    pub default_chain: SupportedChain,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            wallet_proxy_url: None,
            connector_name: "Base Account".to_owned(),
            demo_wallet_enabled: true,
            demo_pending_polls: 1,
            rpc_overrides: BTreeMap::new(),
            request_timeout_ms: 15_000,
            status_poll_interval_ms: 1_000,
            cookie_path: None,
            cookie_max_age_secs: 30 * 24 * 60 * 60,
            default_chain: SupportedChain::BaseSepolia,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `BUILDER_CODES_*` values. Blank values and
    /// unparsable numbers keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self {
            cookie_path: Some(std::env::temp_dir().join("builder-codes.cookies")),
            ..Self::default()
        };

        if let Some(v) = get("BUILDER_CODES_PROFILE") {
            cfg.runtime_profile = RuntimeProfile::from_env_value(&v);
        }
        if let Some(v) = get("BUILDER_CODES_WALLET_PROXY_URL") {
            cfg.wallet_proxy_url = Some(v);
        }
        if let Some(v) = get("BUILDER_CODES_CONNECTOR_NAME") {
            cfg.connector_name = v;
        }
        if let Some(v) = get("BUILDER_CODES_DEMO_WALLET") {
            cfg.demo_wallet_enabled =
                !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off");
        }
        if let Some(n) = get("BUILDER_CODES_DEMO_PENDING_POLLS").and_then(|v| v.parse().ok()) {
            cfg.demo_pending_polls = n;
        }
        for (chain, key) in [
            (SupportedChain::Base, "BUILDER_CODES_RPC_BASE"),
            (SupportedChain::BaseSepolia, "BUILDER_CODES_RPC_BASE_SEPOLIA"),
            (SupportedChain::Sepolia, "BUILDER_CODES_RPC_SEPOLIA"),
        ] {
            if let Some(v) = get(key) {
                cfg.rpc_overrides.insert(chain, v);
            }
        }
        if let Some(n) = get("BUILDER_CODES_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            cfg.request_timeout_ms = n;
        }
        if let Some(n) = get("BUILDER_CODES_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            cfg.status_poll_interval_ms = n;
        }
        if let Some(v) = get("BUILDER_CODES_COOKIE_PATH") {
            cfg.cookie_path = Some(PathBuf::from(v));
        }
        if let Some(chain) = get("BUILDER_CODES_DEFAULT_CHAIN")
            .and_then(|v| v.parse::<u64>().ok())
            .and_then(SupportedChain::from_chain_id)
        {
            cfg.default_chain = chain;
        }
        cfg
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn rpc_url(&self, chain: SupportedChain) -> String {
        self.rpc_overrides
            .get(&chain)
            .cloned()
            .unwrap_or_else(|| chain.default_rpc_url().to_owned())
    }
}
