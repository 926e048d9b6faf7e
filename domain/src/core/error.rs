//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("No active judges available")]
    NoJudges,

    #[error("Invalid judge weight for {judge_id}: {weight}")]
    InvalidWeight { judge_id: String, weight: f64 },

    #[error("Invalid confidence: {0}")]
    InvalidConfidence(f64),

    #[error("Empty review payload")]
    EmptyPayload,

    #[error("Judge {judge_id} is not part of request {request_id}")]
    UnknownJudge { request_id: String, judge_id: String },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

impl DomainError {
    /// Check if this error should be reported to the client as a validation problem
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyPayload | DomainError::MalformedMessage(_)
        )
    }
}
