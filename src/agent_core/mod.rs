//! Agent Core — orchestration layer for the hospital front desk.
//!
//! Submodules:
//! - `record_store`: Observable in-memory patients, appointments, and financial records
//! - `tools`: Tool catalog and system instruction sent to the model
//! - `tool_router`: Dispatches model tool calls to the record store
//! - `conversation`: Model-facing dialogue state machine
//! - `orchestrator`: The per-utterance agent loop and user transcript
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod record_store;
pub mod tool_router;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use conversation::{ConversationSession, SessionState, TurnOutcome};
pub use errors::AgentError;
pub use orchestrator::{
    CallbackObserver, Orchestrator, TurnObserver, APOLOGY_TEXT, FALLBACK_TEXT,
};
pub use record_store::{
    Appointment, AppointmentStatus, CareStatus, FinancialKind, FinancialRecord, FinancialStatus,
    NewAppointment, NewFinancialRecord, NewPatient, Patient, PatientUpdate, RecordStore,
    StoreSnapshot, Subscription,
};
pub use tool_router::ToolRouter;
pub use tools::ToolName;
pub use types::{Message, Sender, ToolResponse, ToolResult, ToolStatus};
