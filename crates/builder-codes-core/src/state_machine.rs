use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ConnectionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal connection transition: {from:?} --{action:?}-->")]
    Connection {
        from: ConnectionStatus,
        action: ConnectionAction,
    },
    #[error("illegal submission transition: {from:?} --{action:?}-->")]
    Submission {
        from: SubmissionStatus,
        action: SubmissionAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionAction {
    Connect,
    Reconnect,
    Established,
    Failed,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Idle,
    Configuring,
    Submitting,
    Pending,
    Included,
    Failed,
}

impl SubmissionStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionStatus::Submitting | SubmissionStatus::Pending)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Included | SubmissionStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionAction {
    Edit,
    Submit,
    Accepted,
    Rejected,
    PollPending,
    Included,
    BatchFailed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition<S> {
    pub from: S,
    pub to: S,
    pub reason: &'static str,
}

pub fn connection_transition(
    from: ConnectionStatus,
    action: ConnectionAction,
) -> Result<(ConnectionStatus, StateTransition<ConnectionStatus>), TransitionError> {
    use ConnectionAction as A;
    use ConnectionStatus as S;

    let (to, reason) = match (from, action) {
        (S::Disconnected, A::Connect) => (S::Connecting, "connect requested"),
        (S::Disconnected, A::Reconnect) => (S::Connecting, "restoring persisted session"),
        (S::Connecting, A::Established) => (S::Connected, "connector returned accounts"),
        (S::Connecting, A::Failed) => (S::Disconnected, "connector failed"),
        (S::Connected, A::Disconnect) => (S::Disconnected, "disconnect requested"),
        (S::Connecting, A::Disconnect) => (S::Disconnected, "disconnect while connecting"),
        _ => return Err(TransitionError::Connection { from, action }),
    };
    Ok((to, StateTransition { from, to, reason }))
}

pub fn submission_transition(
    from: SubmissionStatus,
    action: SubmissionAction,
) -> Result<(SubmissionStatus, StateTransition<SubmissionStatus>), TransitionError> {
    use SubmissionAction as A;
    use SubmissionStatus as S;

    let (to, reason) = match (from, action) {
        (S::Idle | S::Configuring, A::Edit) => (S::Configuring, "form edited"),
        (S::Included | S::Failed, A::Edit) => (S::Configuring, "form edited after outcome"),
        // No cancellation: edits never disturb an in-flight batch.
        (S::Submitting, A::Edit) => (S::Submitting, "edit ignored while submitting"),
        (S::Pending, A::Edit) => (S::Pending, "edit ignored while pending"),
        (S::Idle | S::Configuring | S::Included | S::Failed, A::Submit) => {
            (S::Submitting, "batch sent to wallet")
        }
        (S::Submitting, A::Accepted) => (S::Pending, "wallet returned calls id"),
        (S::Submitting, A::Rejected) => (S::Failed, "wallet rejected batch"),
        (S::Pending, A::PollPending) => (S::Pending, "batch not yet included"),
        (S::Pending, A::Included) => (S::Included, "receipt available"),
        (S::Pending, A::BatchFailed) => (S::Failed, "wallet reported batch failure"),
        (S::Pending, A::Rejected) => (S::Failed, "status poll failed"),
        (_, A::Reset) => (S::Idle, "reset"),
        _ => return Err(TransitionError::Submission { from, action }),
    };
    Ok((to, StateTransition { from, to, reason }))
}
