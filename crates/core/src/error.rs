//! Error taxonomy for core state operations.

use thiserror::Error;

/// Failures produced by the state machine, sync gateway, and registry.
///
/// Broadcast delivery problems are deliberately absent: a failed fan-out
/// never rolls back a committed state change and is reported in-band via
/// [`crate::registry::BroadcastReport`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed timetable or run-state input, rejected before any mutation.
    #[error("{0}")]
    Validation(String),
    /// Station index outside the live timetable bounds.
    #[error("station index {idx} out of range for {len} stations")]
    OutOfRange {
        /// Index as supplied by the caller.
        idx: i64,
        /// Length of the live timetable.
        len: usize,
    },
    /// Phase value outside the ARRIVED/DEPARTED enumeration.
    #[error("invalid phase {0}, expected 0 (arrived) or 1 (departed)")]
    InvalidPhase(i64),
    /// `key` command without a key code payload.
    #[error("command 'key' requires a keyCode")]
    MissingKeyCode,
    /// Command tag outside the closed command set.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// Display id not present in the registry.
    #[error("display '{0}' not found")]
    NotFound(String),
    /// Display id already present in the registry.
    #[error("display '{0}' already open")]
    DuplicateId(String),
}

impl CoreError {
    /// Stable machine-readable tag carried in wire responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::OutOfRange { .. } => "out_of_range",
            CoreError::InvalidPhase(_) => "invalid_phase",
            CoreError::MissingKeyCode => "missing_key_code",
            CoreError::UnknownCommand(_) => "unknown_command",
            CoreError::NotFound(_) => "not_found",
            CoreError::DuplicateId(_) => "duplicate_id",
        }
    }
}
