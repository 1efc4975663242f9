pub mod attribution;
pub mod domain;
pub mod inspector;
pub mod ports;
pub mod state_machine;
pub mod submission;

pub use attribution::{Attribution, AttributionError, Schema};
pub use domain::{
    Call, CallBatchStatus, CallReceipt, CallsId, Connection, ConnectionStatus, ConnectorInfo,
    DataSuffix, SessionSnapshot, SupportedChain,
};
pub use inspector::{InspectorOutcome, InspectorState};
pub use ports::{ClockPort, PortError, ProviderPort, SessionStorePort, TransportPort};
pub use state_machine::{
    connection_transition, submission_transition, ConnectionAction, StateTransition,
    SubmissionAction, SubmissionStatus, TransitionError,
};
pub use submission::{
    AttributionChoice, AttributionMode, CallVariant, FlowEdit, FlowError, SendCallsFlow,
    SendCallsForm, SendCallsRequest,
};
