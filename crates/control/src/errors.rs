//! Error types for the session control domain.
//!
//! [`ControlError`] is what every [`crate::ControlPlane`] implementation
//! returns. It serialises, so a remote caller sees exactly the variant the
//! server produced.
//!
//! [`CapabilityError`] is raised by problem-domain implementations and carried
//! inside [`ControlError::Capability`] without reinterpretation.
//!
//! [`JournalError`] belongs to the instrumentation-log port. It is reported,
//! never escalated into a dispatch failure, except for an explicit rotation
//! request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Capability-level errors
// ---------------------------------------------------------------------------

/// Failures raised by a [`crate::ProblemDomain`] implementation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapabilityError {
    /// A solution slot outside `0..memory_size`, or one that holds no solution yet.
    #[error("invalid solution slot {slot} (memory size {memory_size})")]
    InvalidSlot {
        /// The offending slot.
        slot: usize,
        /// The memory size at the time of the call.
        memory_size: usize,
    },

    /// A heuristic id outside `0..number_of_heuristics`.
    #[error("invalid heuristic {heuristic} (domain has {available})")]
    InvalidHeuristic { heuristic: usize, available: usize },

    /// An instance index outside `0..number_of_instances`.
    #[error("invalid instance {instance} (domain has {available})")]
    InvalidInstance { instance: usize, available: usize },

    /// The domain does not support this operation (e.g. a crossover heuristic
    /// invoked through the two-slot form).
    #[error("operation not supported: {operation}")]
    Unsupported { operation: String },

    /// Any other domain-reported failure.
    #[error("{message}")]
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// Control-plane errors
// ---------------------------------------------------------------------------

/// Errors surfaced to callers of the control plane.
///
/// Every session-scoped variant carries the session id and operation name so
/// the failing call can be reconstructed without the instrumentation log.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ControlError {
    /// No live session is registered under `session_id`.
    ///
    /// Raised before any capability call is made.
    #[error("Problem domain with id {session_id} was not found ({operation}).")]
    SessionNotFound {
        session_id: String,
        operation: String,
        /// Space-separated argument values after the session id.
        args: String,
    },

    /// A request argument could not be decoded into the operation's parameter
    /// type. The attempt is still written to the instrumentation log.
    #[error("invalid argument for {operation}({args}): {message}")]
    InvalidArgument {
        /// Absent for process-level operations such as session creation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        operation: String,
        /// Raw argument values as received, space-separated.
        args: String,
        message: String,
    },

    /// The capability rejected the operation; `source` is passed through unchanged.
    #[error("{operation}({args}) on session {session_id} failed: {source}")]
    Capability {
        session_id: String,
        operation: String,
        /// Space-separated argument values, as written to the instrumentation log.
        args: String,
        #[source]
        source: CapabilityError,
    },

    /// An explicit log rotation request could not open the next epoch file.
    #[error("instrumentation log rotation failed: {message}")]
    LogRotation { message: String },

    /// The capability call did not complete (e.g. it panicked).
    #[error("internal error during {operation}({args}): {message}")]
    Internal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        operation: String,
        args: String,
        message: String,
    },

    /// The control plane could not be reached or answered with something
    /// that is not a control-plane response. Produced by remote clients only.
    #[error("control plane unavailable: {message}")]
    Unavailable { message: String },
}

impl ControlError {
    /// Returns `true` for errors caused by the request itself rather than the
    /// server or the transport.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ControlError::SessionNotFound { .. }
                | ControlError::InvalidArgument { .. }
                | ControlError::Capability { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Instrumentation-log errors
// ---------------------------------------------------------------------------

/// Failures writing to or rotating the instrumentation log.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The underlying file could not be created, written, or flushed.
    #[error("journal I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The journal was closed at shutdown and accepts no further lines.
    #[error("journal is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_error_round_trips_through_json() {
        let err = ControlError::Capability {
            session_id: "abc".to_string(),
            operation: "applyHeuristic".to_string(),
            args: "abc 9 0 1".to_string(),
            source: CapabilityError::InvalidHeuristic {
                heuristic: 9,
                available: 4,
            },
        };
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["error"], "capability");
        assert_eq!(json["source"]["kind"], "invalid_heuristic");
        let back: ControlError = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, err);
    }

    #[test]
    fn session_not_found_message_names_the_id() {
        let err = ControlError::SessionNotFound {
            session_id: "nope".to_string(),
            operation: "setMemorySize".to_string(),
            args: "3".to_string(),
        };
        assert!(err.to_string().contains("nope"));
        assert!(err.is_client_error());
        assert!(!ControlError::Unavailable {
            message: "refused".to_string()
        }
        .is_client_error());
    }

    #[test]
    fn invalid_argument_is_a_client_error_and_names_the_call() {
        let err = ControlError::InvalidArgument {
            session_id: Some("abc".to_string()),
            operation: "setMemorySize".to_string(),
            args: "abc -1".to_string(),
            message: "argument 1 (\"-1\"): invalid digit found in string".to_string(),
        };
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("invalid argument for setMemorySize(abc -1)"));

        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["error"], "invalid_argument");
        let back: ControlError = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, err);
    }

    #[test]
    fn internal_error_omits_absent_session_id_on_the_wire() {
        let err = ControlError::Internal {
            session_id: None,
            operation: "changelog".to_string(),
            args: String::new(),
            message: "worker panicked".to_string(),
        };
        let json = serde_json::to_value(&err).expect("serialize");
        assert!(json.get("session_id").is_none());
        assert!(!err.is_client_error());
        let back: ControlError = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, err);
    }
}
