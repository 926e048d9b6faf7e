//! Terminal messages relayed to a session

use crate::core::error::DomainError;
use crate::quorum::ConsensusResult;
use crate::review::RequestId;
use serde::{Deserialize, Serialize};

/// Request-level failure categories visible to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewErrorKind {
    /// The active judge set was empty at dispatch time
    NoJudges,
    /// The transport fabric could not accept the fan-out
    Transport,
    /// The request could not be dispatched as submitted
    InvalidRequest,
}

/// A message published on a session's result channel.
///
/// Every review request yields exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Consensus(ConsensusResult),
    ReviewError {
        request_id: Option<RequestId>,
        kind: ReviewErrorKind,
        message: String,
    },
}

impl SessionEvent {
    pub fn no_judges(request_id: RequestId) -> Self {
        SessionEvent::ReviewError {
            request_id: Some(request_id),
            kind: ReviewErrorKind::NoJudges,
            message: "no judges available".to_string(),
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            SessionEvent::Consensus(consensus) => Some(consensus.request_id),
            SessionEvent::ReviewError { request_id, .. } => *request_id,
        }
    }

    pub fn encode(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }
}
