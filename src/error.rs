//! Error types for expflow
//!
//! Every violation is raised at the point it happens and surfaced to the
//! caller. Messages say what to do next where there is an obvious fix.

use thiserror::Error;

use crate::status::Status;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Expflow error types
#[derive(Error, Debug)]
pub enum Error {
    /// A participant record with this id is already persisted
    #[error("Participant {participant_id} already exists\nLoad the existing participant instead of creating a new one")]
    ParticipantExists {
        /// Offending participant id
        participant_id: String,
    },

    /// An experiment references a participant that was never created
    #[error("Participant {participant_id} does not exist\nCreate the participant before creating an experiment for them")]
    ParticipantDoesNotExist {
        /// Missing participant id
        participant_id: String,
    },

    /// The participant already started this experiment
    #[error("Participant {participant_id} already started experiment {experiment_id}\nLoad the existing experiment to resume it; an experiment can never be repeated")]
    ExperimentExists {
        /// Participant id
        participant_id: String,
        /// Experiment id
        experiment_id: String,
    },

    /// No persisted record for the requested key
    #[error("Record not found: {key}")]
    RecordNotFound {
        /// Human-readable record key
        key: String,
    },

    /// Status change not present in the transition table
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Status before the attempted change
        from: Status,
        /// Requested status
        to: Status,
    },

    /// Trial sequence changed after iteration began
    #[error("Trial sequence is frozen: {0}")]
    SequenceMutation(String),

    /// Stored record is of a different kind than requested
    #[error("Type mismatch: expected {expected} record, found {found}")]
    TypeMismatch {
        /// Kind the caller asked for
        expected: String,
        /// Kind found in the record
        found: String,
    },

    /// Identifier fails validation
    #[error("Invalid id {0:?}: ids need at least 3 characters from [A-Za-z0-9_-]")]
    InvalidId(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation needs a current trial but iteration has not started
    #[error("No current trial: iteration has not started")]
    NoCurrentTrial,

    /// Storage error (codec, layout)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidTransition`].
    #[must_use]
    pub const fn invalid_transition(from: Status, to: Status) -> Self {
        Self::InvalidTransition { from, to }
    }
}
