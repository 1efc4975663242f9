//! Application state types
//!
//! Flow state (submission, inspector) lives in builder-codes-core; these are
//! the shell-only pieces around it.

use std::sync::Mutex;
use std::time::Duration;

use web_time::Instant;

use builder_codes_core::{Connection, SubmissionStatus};

/// Outcome of the most recent user-initiated connect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectAttempt {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl ConnectAttempt {
    pub fn label(self) -> &'static str {
        match self {
            ConnectAttempt::Idle => "idle",
            ConnectAttempt::Pending => "pending",
            ConnectAttempt::Success => "success",
            ConnectAttempt::Error => "error",
        }
    }
}

/// Connect/Connection panel state
#[derive(Debug, Default)]
pub struct ConnectionPanelState {
    /// Last known connection, refreshed after every wallet round trip
    pub connection: Connection,
    /// Connector uid while a connect is in flight
    pub connecting: Option<String>,
    /// Startup reconnect from the session cookie
    pub restoring: bool,
    pub disconnecting: bool,
    pub error: Option<String>,
    pub latest_block: Option<u64>,
    pub block_error: Option<String>,
    pub block_loading: bool,
    pub attempt: ConnectAttempt,
}

impl ConnectionPanelState {
    pub fn is_busy(&self) -> bool {
        self.connecting.is_some() || self.restoring || self.disconnecting
    }

    pub fn begin_connect(&mut self, uid: String) {
        self.connecting = Some(uid);
        self.error = None;
        self.attempt = ConnectAttempt::Pending;
    }

    /// Settles a connect or a startup restore. Only a connect moves `attempt`.
    pub fn finish_connect(&mut self, ok: bool) {
        if self.connecting.take().is_some() {
            self.attempt = if ok {
                ConnectAttempt::Success
            } else {
                ConnectAttempt::Error
            };
        }
        self.restoring = false;
    }
}

/// Gate for `wallet_getCallsStatus` polling: one request at a time, at most
/// once per interval.
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    last: Option<Instant>,
    in_flight: bool,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            in_flight: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn due(&self, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn started(&mut self, now: Instant) {
        self.last = Some(now);
        self.in_flight = true;
    }

    pub fn finished(&mut self) {
        self.in_flight = false;
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.in_flight = false;
    }
}

pub fn submission_status_label(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Idle | SubmissionStatus::Configuring => "Ready",
        SubmissionStatus::Submitting => "Waiting for wallet…",
        SubmissionStatus::Pending => "Pending",
        SubmissionStatus::Included => "Included",
        SubmissionStatus::Failed => "Failed",
    }
}

/// Stores a background result for the update loop to pick up.
pub fn put<T>(slot: &Mutex<Option<T>>, value: T) {
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(value);
    }
}

pub fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}
