use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use builder_codes_core::{
    connection_transition, CallBatchStatus, CallsId, Connection, ConnectionAction,
    ConnectionStatus, ConnectorInfo, PortError, ProviderPort, SendCallsRequest, SessionSnapshot,
    SessionStorePort, StateTransition, SupportedChain,
};

use crate::cookie::CookieStorage;
use crate::eip1193::Eip1193Adapter;
use crate::transport::{transports, HttpTransport};
use crate::AppConfig;

/// Connectors offered to the user. An empty list is a valid outcome.
pub fn discover_connectors(config: &AppConfig) -> Vec<Eip1193Adapter> {
    let mut connectors = Vec::new();
    if let Some(url) = &config.wallet_proxy_url {
        connectors.push(Eip1193Adapter::proxy(config, url));
    }
    if config.demo_wallet_enabled && !config.strict_runtime_required() {
        connectors.push(Eip1193Adapter::deterministic(config));
    }
    if connectors.is_empty() {
        tracing::warn!(profile = ?config.runtime_profile, "no wallet connectors available");
    }
    connectors
}

/// Owns the connectors, the per-chain transports, the cookie store and the
/// current connection. Only `connect`, `disconnect` and `reconnect` move the
/// connection status.
#[derive(Debug)]
pub struct WalletSession {
    connectors: Vec<Eip1193Adapter>,
    transports: BTreeMap<SupportedChain, HttpTransport>,
    storage: CookieStorage,
    connection: Mutex<Connection>,
    transitions: Mutex<Vec<StateTransition<ConnectionStatus>>>,
}

impl WalletSession {
    pub fn new(
        connectors: Vec<Eip1193Adapter>,
        transports: BTreeMap<SupportedChain, HttpTransport>,
        storage: CookieStorage,
    ) -> Self {
        Self {
            connectors,
            transports,
            storage,
            connection: Mutex::new(Connection::default()),
            transitions: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PortError> {
        Ok(Self::new(
            discover_connectors(config),
            transports(config)?,
            CookieStorage::from_config(config),
        ))
    }

    pub fn connectors(&self) -> Vec<ConnectorInfo> {
        self.connectors.iter().map(ProviderPort::info).collect()
    }

    pub fn connector(&self, uid: &str) -> Option<&Eip1193Adapter> {
        self.connectors.iter().find(|c| c.info().uid == uid)
    }

    pub fn connection(&self) -> Result<Connection, PortError> {
        Ok(self.lock_connection()?.clone())
    }

    pub fn transitions(&self) -> Result<Vec<StateTransition<ConnectionStatus>>, PortError> {
        Ok(self.lock_transitions()?.clone())
    }

    pub fn storage(&self) -> &CookieStorage {
        &self.storage
    }

    pub fn transport(&self, chain: SupportedChain) -> Option<&HttpTransport> {
        self.transports.get(&chain)
    }

    pub fn connect(&self, uid: &str) -> Result<Connection, PortError> {
        let connector = self
            .connector(uid)
            .ok_or_else(|| PortError::NotFound(format!("connector not found: {uid}")))?;
        self.begin(ConnectionAction::Connect, uid)?;
        tracing::info!(connector = uid, "connecting wallet");
        self.establish(connector)
    }

    /// Restores the connection recorded in the session cookie, if any.
    pub fn reconnect(&self) -> Result<Connection, PortError> {
        let Some(snapshot) = self.storage.load()? else {
            return self.connection();
        };
        if snapshot.status != ConnectionStatus::Connected {
            return self.connection();
        }
        let Some(connector) = self.connector(&snapshot.connector_uid) else {
            tracing::warn!(
                connector = %snapshot.connector_uid,
                "stored connector is no longer available, dropping session"
            );
            self.storage.clear()?;
            return self.connection();
        };
        self.begin(ConnectionAction::Reconnect, &snapshot.connector_uid)?;
        tracing::info!(connector = %snapshot.connector_uid, "restoring wallet session");
        if let Some(chain_id) = snapshot.chain_id {
            if let Err(e) = connector.switch_chain(chain_id) {
                tracing::warn!(chain_id, error = %e, "could not restore stored chain");
            }
        }
        self.establish(connector)
    }

    pub fn disconnect(&self) -> Result<Connection, PortError> {
        let (status, uid) = {
            let conn = self.lock_connection()?;
            (conn.status, conn.connector_uid.clone())
        };
        if status == ConnectionStatus::Disconnected {
            self.storage.clear()?;
            return self.connection();
        }
        if let Some(connector) = uid.as_deref().and_then(|uid| self.connector(uid)) {
            connector.disconnect()?;
        }
        {
            let mut conn = self.lock_connection()?;
            self.apply(&mut conn, ConnectionAction::Disconnect)?;
            *conn = Connection::default();
        }
        self.storage.clear()?;
        tracing::info!("wallet disconnected");
        self.connection()
    }

    /// Switches the wallet to the request's chain first when they differ.
    pub fn send_calls(&self, request: &SendCallsRequest) -> Result<CallsId, PortError> {
        let (connector, chain_id) = self.connected_connector()?;
        if chain_id != Some(request.chain_id) {
            connector.switch_chain(request.chain_id)?;
            let snapshot = {
                let mut conn = self.lock_connection()?;
                conn.chain_id = Some(request.chain_id);
                SessionSnapshot::from_connection(&conn)
            };
            if let Some(snapshot) = snapshot {
                self.persist(&snapshot);
            }
        }
        let id = connector.send_calls(request)?;
        tracing::info!(
            calls_id = %id,
            chain_id = request.chain_id,
            calls = request.calls.len(),
            attributed = request.data_suffix.is_some(),
            "call batch submitted"
        );
        Ok(id)
    }

    pub fn calls_status(&self, id: &CallsId) -> Result<CallBatchStatus, PortError> {
        let (connector, _) = self.connected_connector()?;
        connector.get_calls_status(id)
    }

    fn connected_connector(&self) -> Result<(&Eip1193Adapter, Option<u64>), PortError> {
        let conn = self.lock_connection()?;
        if !conn.is_connected() {
            return Err(PortError::Policy("wallet is not connected".to_owned()));
        }
        let uid = conn.connector_uid.clone().unwrap_or_default();
        let connector = self
            .connector(&uid)
            .ok_or_else(|| PortError::NotFound(format!("connector not found: {uid}")))?;
        Ok((connector, conn.chain_id))
    }

    fn begin(&self, action: ConnectionAction, uid: &str) -> Result<(), PortError> {
        let mut conn = self.lock_connection()?;
        self.apply(&mut conn, action)?;
        conn.connector_uid = Some(uid.to_owned());
        Ok(())
    }

    // The wallet calls may block on user approval, so the connection lock is
    // released around them.
    fn establish(&self, connector: &Eip1193Adapter) -> Result<Connection, PortError> {
        let outcome = connector
            .request_accounts()
            .and_then(|addresses| Ok((addresses, connector.chain_id()?)));

        let mut conn = self.lock_connection()?;
        match outcome {
            Ok((addresses, chain_id)) => {
                self.apply(&mut conn, ConnectionAction::Established)?;
                conn.addresses = addresses;
                conn.chain_id = Some(chain_id);
                let connected = conn.clone();
                drop(conn);
                if let Some(snapshot) = SessionSnapshot::from_connection(&connected) {
                    self.persist(&snapshot);
                }
                tracing::info!(
                    connector = ?connected.connector_uid,
                    chain_id,
                    accounts = connected.addresses.len(),
                    "wallet connected"
                );
                Ok(connected)
            }
            Err(e) => {
                if let Err(transition) = self.apply(&mut conn, ConnectionAction::Failed) {
                    tracing::warn!(error = %transition, "connection state moved during connect");
                }
                *conn = Connection::default();
                tracing::warn!(error = %e, "wallet connection failed");
                Err(e)
            }
        }
    }

    fn apply(&self, conn: &mut Connection, action: ConnectionAction) -> Result<(), PortError> {
        let (to, transition) = connection_transition(conn.status, action)
            .map_err(|e| PortError::Policy(e.to_string()))?;
        conn.status = to;
        self.lock_transitions()?.push(transition);
        Ok(())
    }

    fn persist(&self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.storage.save(snapshot) {
            tracing::warn!(error = %e, "failed to persist session cookie");
        }
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, PortError> {
        self.connection
            .lock()
            .map_err(|e| PortError::Transport(format!("connection lock poisoned: {e}")))
    }

    fn lock_transitions(
        &self,
    ) -> Result<MutexGuard<'_, Vec<StateTransition<ConnectionStatus>>>, PortError> {
        self.transitions
            .lock()
            .map_err(|e| PortError::Transport(format!("transition log lock poisoned: {e}")))
    }
}
