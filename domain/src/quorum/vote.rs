//! Vote types for Quorum consensus
//!
//! This module defines the per-judge voting primitives.

use crate::review::RequestId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two decision literals a judge may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept => write!(f, "accept"),
            Decision::Reject => write!(f, "reject"),
        }
    }
}

/// A single judge's result for one request
///
/// Either a vote (`decision` set, `error` empty) or a failure (`error` set,
/// `decision` empty). Failures still count toward the barrier.
///
/// # Example
///
/// ```
/// use magi_domain::quorum::{Decision, JudgementResult};
/// use magi_domain::review::RequestId;
///
/// let id = RequestId::new();
/// let vote = JudgementResult::vote(id, "melchior", Decision::Accept, 0.9, 1.0);
/// assert_eq!(vote.decision, Some(Decision::Accept));
///
/// let failed = JudgementResult::failure(id, "casper", "timeout");
/// assert!(failed.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementResult {
    pub request_id: RequestId,
    pub judge_id: String,
    #[serde(default)]
    pub judge_name: Option<String>,
    pub decision: Option<Decision>,
    /// Confidence level (0.0 to 1.0)
    pub confidence: f64,
    /// Contribution to the winning bucket: weight × confidence (0 for errors)
    pub score: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    pub error: Option<String>,
}

impl JudgementResult {
    /// Create a vote; `confidence` is clamped to `[0, 1]`.
    pub fn vote(
        request_id: RequestId,
        judge_id: impl Into<String>,
        decision: Decision,
        confidence: f64,
        weight: f64,
    ) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            request_id,
            judge_id: judge_id.into(),
            judge_name: None,
            decision: Some(decision),
            confidence,
            score: weight.max(0.0) * confidence,
            reasoning: None,
            error: None,
        }
    }

    /// Create an error result for a judge whose capability call failed.
    pub fn failure(
        request_id: RequestId,
        judge_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            judge_id: judge_id.into(),
            judge_name: None,
            decision: None,
            confidence: 0.0,
            score: 0.0,
            reasoning: None,
            error: Some(error.into()),
        }
    }

    pub fn with_judge_name(mut self, name: impl Into<String>) -> Self {
        self.judge_name = Some(name.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.decision.is_none()
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_creation() {
        let id = RequestId::new();
        let vote = JudgementResult::vote(id, "melchior", Decision::Accept, 0.8, 2.0);
        assert_eq!(vote.decision, Some(Decision::Accept));
        assert_eq!(vote.confidence, 0.8);
        assert!((vote.score - 1.6).abs() < f64::EPSILON);
        assert!(!vote.is_error());
    }

    #[test]
    fn test_vote_confidence_is_clamped() {
        let id = RequestId::new();
        let vote = JudgementResult::vote(id, "a", Decision::Reject, 1.5, 1.0);
        assert_eq!(vote.confidence, 1.0);

        let vote = JudgementResult::vote(id, "a", Decision::Reject, f64::NAN, 1.0);
        assert_eq!(vote.confidence, 0.0);
    }

    #[test]
    fn test_failure_has_no_decision() {
        let failed = JudgementResult::failure(RequestId::new(), "casper", "timeout");
        assert!(failed.is_error());
        assert_eq!(failed.decision, None);
        assert_eq!(failed.score, 0.0);
    }

    #[test]
    fn test_decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Accept).unwrap(), "\"accept\"");
        assert_eq!(Decision::Reject.to_string(), "reject");
    }
}
