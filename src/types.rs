//! Core types shared by the tracker, the render engine and the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ErrorKind};

/// What to render: a page to navigate to, or literal markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionTarget {
    Url(String),
    Html(String),
}

impl ConversionTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionTarget::Url(_) => "url",
            ConversionTarget::Html(_) => "html",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConversionTarget::Url(value) | ConversionTarget::Html(value) => value,
        }
    }

    /// Rejects targets whose payload is empty or whitespace.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.as_str().trim().is_empty() {
            return Err(ConversionError::invalid_options(format!(
                "{} target must not be empty",
                self.kind()
            )));
        }
        Ok(())
    }
}

/// Identity of one conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub request_id: String,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            received_at: Utc::now(),
        }
    }
}

/// Terminal result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success(Vec<u8>),
    Failure { kind: ErrorKind, detail: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<u8>, ConversionError> {
        match self {
            ConversionOutcome::Success(bytes) => Ok(bytes),
            ConversionOutcome::Failure { kind, detail } => Err(match kind {
                ErrorKind::InvalidOptions => ConversionError::InvalidOptions(detail),
                ErrorKind::RenderTimeout => ConversionError::RenderTimeout(detail),
                ErrorKind::RenderEngineError => ConversionError::RenderEngine(detail),
            }),
        }
    }
}

impl From<ConversionError> for ConversionOutcome {
    fn from(err: ConversionError) -> Self {
        ConversionOutcome::Failure {
            kind: err.kind(),
            detail: err.detail().to_string(),
        }
    }
}

/// A finished conversion together with the request it belonged to.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub context: RequestContext,
    pub outcome: ConversionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_targets_are_rejected() {
        assert!(ConversionTarget::Html("   ".to_string()).validate().is_err());
        assert!(ConversionTarget::Url(String::new()).validate().is_err());
        assert!(ConversionTarget::Html("<p>x</p>".to_string())
            .validate()
            .is_ok());
    }

    #[test]
    fn outcome_round_trips_error_kind() {
        let outcome: ConversionOutcome = ConversionError::RenderTimeout("30s".to_string()).into();
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderTimeout);
        assert_eq!(err.detail(), "30s");
    }
}
