// ── Core error types ──
//
// Errors surfaced by the engine to its callers. Transient control
// database failures never reach this type from the sync path: they are
// logged and retried by the scheduler. They only show up here when a
// caller performs database I/O directly.

use thiserror::Error;

use crate::sync::DbError;
use crate::wps::{JobId, JobState};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Radio not found: {name}")]
    RadioNotFound { name: String },

    #[error("Interface not found: {name}")]
    InterfaceNotFound { name: String },

    #[error("WPS job not found: {id}")]
    JobNotFound { id: JobId },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("WPS job {id} cannot {operation} in state {state}")]
    InvalidJobState {
        id: JobId,
        operation: &'static str,
        state: JobState,
    },

    #[error("Interface {interface} belongs to radio {actual}, not {claimed}")]
    RadioMismatch {
        interface: String,
        claimed: String,
        actual: String,
    },

    #[error("Feature disabled: {feature}")]
    FeatureDisabled { feature: &'static str },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Invalid document: {message}")]
    Document { message: String },

    // ── Infrastructure errors ────────────────────────────────────────
    #[error("Control database error: {0}")]
    Database(#[from] DbError),

    #[error("Engine task has stopped")]
    EngineStopped,
}
