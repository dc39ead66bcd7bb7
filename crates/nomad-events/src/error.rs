use thiserror::Error;

use crate::validation::ValidationErrors;

/// Why an event could not be projected onto a typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected event kind: expected {expected}, got {actual}")]
    WrongKind { expected: u16, actual: u16 },
    #[error("missing system tag {0}")]
    MissingSystemTag(String),
    #[error("missing required tag: {0}")]
    MissingTag(&'static str),
    #[error("invalid value for tag {tag}: {value}")]
    InvalidValue { tag: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("serde json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}
