use serde::Serialize;
use thiserror::Error;

use nomad_events::{DecodeError, ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
    #[error("nostr client error: {0}")]
    NostrClient(#[from] nostr_sdk::client::Error),
    #[error("nostr key error: {0}")]
    NostrKey(#[from] nostr_sdk::nostr::key::Error),
    #[error("nostr tag error: {0}")]
    NostrTag(#[from] nostr_sdk::nostr::event::tag::Error),
    #[error("nostr event error: {0}")]
    NostrEvent(#[from] nostr_sdk::nostr::event::Error),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("serde json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event error: {0}")]
    Events(#[from] nomad_events::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("relay {relay} rejected event: {reason}")]
    Relay { relay: String, reason: String },
    #[error("failed to upload attachments: {0}")]
    Upload(String),
    #[error("upload cancelled")]
    UploadCancelled,
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("failed to publish to any relay: {0}")]
    Publish(String),
    #[error("operation timed out")]
    Timeout,
    #[error("missing env var: {0}")]
    MissingEnv(&'static str),
    #[error("invalid config {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    NotFound,
    NostrError,
    UploadFailed,
    UploadCancelled,
    PublishFailed,
    ConfigError,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    ExternalService,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

/// Error as reported to a caller that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation(_) => ErrorCode::ValidationFailed,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::NostrClient(_)
            | Error::NostrKey(_)
            | Error::NostrTag(_)
            | Error::NostrEvent(_)
            | Error::Signing(_)
            | Error::Relay { .. }
            | Error::Decode(_) => ErrorCode::NostrError,
            Error::Upload(_) => ErrorCode::UploadFailed,
            Error::UploadCancelled => ErrorCode::UploadCancelled,
            Error::Publish(_) => ErrorCode::PublishFailed,
            Error::MissingEnv(_) | Error::InvalidConfig { .. } => ErrorCode::ConfigError,
            Error::Timeout => ErrorCode::Timeout,
            Error::Json(_) | Error::Events(_) => ErrorCode::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            ErrorCode::ValidationFailed | ErrorCode::NotFound => ErrorCategory::Validation,
            ErrorCode::NostrError
            | ErrorCode::UploadFailed
            | ErrorCode::UploadCancelled
            | ErrorCode::PublishFailed
            | ErrorCode::Timeout => ErrorCategory::ExternalService,
            ErrorCode::ConfigError => ErrorCategory::Configuration,
            ErrorCode::Internal => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.code() {
            ErrorCode::ValidationFailed | ErrorCode::NotFound | ErrorCode::UploadCancelled => {
                ErrorSeverity::Low
            }
            ErrorCode::NostrError
            | ErrorCode::UploadFailed
            | ErrorCode::PublishFailed
            | ErrorCode::Timeout => ErrorSeverity::Medium,
            ErrorCode::ConfigError | ErrorCode::Internal => ErrorSeverity::High,
        }
    }
}

impl From<&Error> for AppError {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code(),
            category: error.category(),
            severity: error.severity(),
            message: error.to_string(),
        }
    }
}

impl From<Error> for AppError {
    fn from(error: Error) -> Self {
        AppError::from(&error)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
