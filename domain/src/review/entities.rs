//! Review request entities

use super::judge::{JudgeConfig, ModelParams};
use crate::core::error::DomainError;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation id shared by a review request, its sub-tasks and its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A client's content-review request (Entity)
///
/// Created by the Gateway and immutable once handed to the Dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub request_id: RequestId,
    pub session_id: SessionId,
    pub payload: String,
    pub submitted_at: DateTime<Utc>,
}

impl ReviewRequest {
    /// Stamp a client payload with a fresh request id and the owning session.
    ///
    /// Whitespace-only payloads are rejected.
    pub fn new(
        session_id: SessionId,
        payload: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let payload = payload.into();
        if payload.trim().is_empty() {
            return Err(DomainError::EmptyPayload);
        }
        Ok(Self {
            request_id: RequestId::new(),
            session_id,
            payload,
            submitted_at,
        })
    }
}

/// One judge's share of a review request (Entity)
///
/// Carries everything a stateless worker needs: the payload plus the judge's
/// persona and model parameters as they were at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementSubTask {
    pub request_id: RequestId,
    pub judge_id: String,
    pub judge_name: String,
    pub weight: f64,
    pub system_prompt: String,
    pub prompt_template: String,
    pub params: ModelParams,
    pub payload: String,
}

impl JudgementSubTask {
    pub fn for_judge(request: &ReviewRequest, judge: &JudgeConfig) -> Self {
        Self {
            request_id: request.request_id,
            judge_id: judge.judge_id.clone(),
            judge_name: judge.display_name().to_string(),
            weight: judge.weight,
            system_prompt: judge.system_prompt.clone(),
            prompt_template: judge.prompt_template.clone(),
            params: judge.params.clone(),
            payload: request.payload.clone(),
        }
    }
}
