use models::{FieldErrors, ModelError};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by the backend platform (data, auth or storage).
/// `message` is the platform's own text and is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: None, code: None, message: message.into() }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), code: None, message: message.into() }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn transport(err: reqwest::Error) -> Self {
        Self { status: err.status().map(|s| s.as_u16()), code: None, message: err.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(FieldErrors),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(fields) => Self::Validation(fields),
            ModelError::Decode(msg) => Self::Decode(msg),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{} not found", entity))
    }

    /// Text shown in the error notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(remote) => remote.message.clone(),
            other => other.to_string(),
        }
    }
}
