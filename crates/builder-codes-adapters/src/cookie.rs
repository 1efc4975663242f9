//! Cookie-backed session storage.
//!
//! The connection snapshot lives in a single cookie so that any view holding
//! the same `Cookie` header reconstructs the same initial state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use builder_codes_core::{ClockPort, PortError, SessionSnapshot, SessionStorePort};

use crate::clock::SystemClockAdapter;
use crate::AppConfig;

pub const SESSION_COOKIE_NAME: &str = "builder-codes.store";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    snapshot: SessionSnapshot,
    expires_at_ms: u64,
}

/// Where the raw `Cookie` header is kept.
#[derive(Debug, Clone)]
pub enum CookieJar {
    Memory(Arc<Mutex<String>>),
    File(PathBuf),
}

impl CookieJar {
    pub fn memory() -> Self {
        CookieJar::Memory(Arc::new(Mutex::new(String::new())))
    }

    fn read(&self) -> Result<String, PortError> {
        match self {
            CookieJar::Memory(header) => header
                .lock()
                .map(|g| g.clone())
                .map_err(|e| PortError::Transport(format!("cookie jar lock poisoned: {e}"))),
            CookieJar::File(path) => match std::fs::read_to_string(path) {
                Ok(header) => Ok(header.trim().to_owned()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
                Err(e) => Err(PortError::Transport(format!(
                    "failed to read cookie jar {}: {e}",
                    path.display()
                ))),
            },
        }
    }

    fn write(&self, header: &str) -> Result<(), PortError> {
        match self {
            CookieJar::Memory(slot) => {
                let mut g = slot
                    .lock()
                    .map_err(|e| PortError::Transport(format!("cookie jar lock poisoned: {e}")))?;
                *g = header.to_owned();
                Ok(())
            }
            CookieJar::File(path) => std::fs::write(path, header).map_err(|e| {
                PortError::Transport(format!(
                    "failed to write cookie jar {}: {e}",
                    path.display()
                ))
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieStorage<C: ClockPort = SystemClockAdapter> {
    jar: CookieJar,
    max_age_secs: u64,
    clock: C,
}

impl CookieStorage {
    pub fn from_config(config: &AppConfig) -> Self {
        let jar = match &config.cookie_path {
            Some(path) => CookieJar::File(path.clone()),
            None => CookieJar::memory(),
        };
        Self::new(jar, config.cookie_max_age_secs, SystemClockAdapter)
    }
}

impl<C: ClockPort> CookieStorage<C> {
    pub fn new(jar: CookieJar, max_age_secs: u64, clock: C) -> Self {
        Self {
            jar,
            max_age_secs,
            clock,
        }
    }

    /// Snapshot carried by a raw `Cookie` header, if present and unexpired.
    pub fn initial_state(&self, cookie_header: &str) -> Result<Option<SessionSnapshot>, PortError> {
        let Some(value) = find_cookie(cookie_header, SESSION_COOKIE_NAME) else {
            return Ok(None);
        };
        let Some(stored) = decode_value(value) else {
            tracing::warn!("ignoring unreadable session cookie");
            return Ok(None);
        };
        if stored.expires_at_ms <= self.clock.now_ms()? {
            tracing::info!("session cookie expired");
            return Ok(None);
        }
        Ok(Some(stored.snapshot))
    }

    /// The `Set-Cookie` value matching what `save` stores.
    pub fn set_cookie_header(&self, snapshot: &SessionSnapshot) -> Result<String, PortError> {
        let value = self.encode_snapshot(snapshot)?;
        Ok(format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={}; SameSite=Lax",
            self.max_age_secs
        ))
    }

    pub fn cookie_header(&self) -> Result<String, PortError> {
        self.jar.read()
    }

    fn encode_snapshot(&self, snapshot: &SessionSnapshot) -> Result<String, PortError> {
        let stored = StoredSession {
            snapshot: snapshot.clone(),
            expires_at_ms: self
                .clock
                .now_ms()?
                .saturating_add(self.max_age_secs.saturating_mul(1_000)),
        };
        let json = serde_json::to_vec(&stored)
            .map_err(|e| PortError::Validation(format!("session serialize failed: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<C: ClockPort> SessionStorePort for CookieStorage<C> {
    fn load(&self) -> Result<Option<SessionSnapshot>, PortError> {
        let header = self.jar.read()?;
        self.initial_state(&header)
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), PortError> {
        let value = self.encode_snapshot(snapshot)?;
        let header = self.jar.read()?;
        self.jar
            .write(&upsert_cookie(&header, SESSION_COOKIE_NAME, &value))
    }

    fn clear(&self) -> Result<(), PortError> {
        let header = self.jar.read()?;
        self.jar.write(&remove_cookie(&header, SESSION_COOKIE_NAME))
    }
}

fn decode_value(value: &str) -> Option<StoredSession> {
    let bytes = URL_SAFE_NO_PAD.decode(value.trim()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        Some((name.trim(), value.trim()))
    })
}

pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    pairs(header).find(|(n, _)| *n == name).map(|(_, v)| v)
}

fn upsert_cookie(header: &str, name: &str, value: &str) -> String {
    let mut out: Vec<String> = pairs(header)
        .filter(|(n, _)| *n != name)
        .map(|(n, v)| format!("{n}={v}"))
        .collect();
    out.push(format!("{name}={value}"));
    out.join("; ")
}

fn remove_cookie(header: &str, name: &str) -> String {
    pairs(header)
        .filter(|(n, _)| *n != name)
        .map(|(n, v)| format!("{n}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}
