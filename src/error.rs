use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced to callers of a conversion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Render timed out: {0}")]
    RenderTimeout(String),

    #[error("Render engine error: {0}")]
    RenderEngine(String),
}

impl ConversionError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        ConversionError::InvalidOptions(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        ConversionError::RenderEngine(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::InvalidOptions(_) => ErrorKind::InvalidOptions,
            ConversionError::RenderTimeout(_) => ErrorKind::RenderTimeout,
            ConversionError::RenderEngine(_) => ErrorKind::RenderEngineError,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ConversionError::InvalidOptions(msg)
            | ConversionError::RenderTimeout(msg)
            | ConversionError::RenderEngine(msg) => msg,
        }
    }

    pub fn to_payload(&self, request_id: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            error_kind: self.kind(),
            detail: self.detail().to_string(),
            request_id: Some(request_id.into()),
        }
    }
}

/// Failure taxonomy exposed on the wire and in log details.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller error; never retried by the service.
    InvalidOptions,
    /// Page did not finish loading in time; safe to retry.
    RenderTimeout,
    /// Browser fault, navigation failure or a crashed session.
    RenderEngineError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidOptions => "InvalidOptions",
            ErrorKind::RenderTimeout => "RenderTimeout",
            ErrorKind::RenderEngineError => "RenderEngineError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body returned for failed conversions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error_kind: ErrorKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Startup and serving failures of the service process.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl HubError {
    pub fn config(message: impl Into<String>) -> Self {
        HubError::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
