//! Work-queue envelopes

use crate::core::error::DomainError;
use crate::quorum::{BarrierAnnouncement, JudgementResult};
use crate::review::{JudgementSubTask, ReviewRequest};
use serde::{Deserialize, Serialize};

/// Logical queue topic names, one per message kind.
pub mod topics {
    /// Gateway → Dispatcher: a stamped review request
    pub const REVIEW_REQUEST: &str = "review.request";
    /// Dispatcher → Aggregator: barrier registration
    pub const BARRIER: &str = "judgement.barrier";
    /// Dispatcher → Judge workers: one sub-task per judge
    pub const SUBTASK: &str = "judgement.subtask";
    /// Judge workers → Aggregator: one result per sub-task
    pub const RESULT: &str = "judgement.result";
}

/// A message carried on a work queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum QueueMessage {
    ReviewRequest(ReviewRequest),
    BarrierOpened(BarrierAnnouncement),
    SubTask(JudgementSubTask),
    Result(JudgementResult),
}

impl QueueMessage {
    /// The queue topic this message belongs on.
    pub fn topic(&self) -> &'static str {
        match self {
            QueueMessage::ReviewRequest(_) => topics::REVIEW_REQUEST,
            QueueMessage::BarrierOpened(_) => topics::BARRIER,
            QueueMessage::SubTask(_) => topics::SUBTASK,
            QueueMessage::Result(_) => topics::RESULT,
        }
    }

    pub fn encode(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }
}
