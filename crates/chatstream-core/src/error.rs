use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed patch: {op} at '{path}': {reason}")]
    MalformedPatch {
        op: String,
        path: String,
        reason: String,
    },

    #[error("Extraction mismatch at '{path}': expected {expected}")]
    ExtractionMismatch { path: String, expected: &'static str },

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Feedback submission failed: {0}")]
    FeedbackSubmission(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Errors that only affect a single op or lookup and never abort a turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedPatch { .. } | Error::ExtractionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
