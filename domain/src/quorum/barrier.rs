//! Join barrier for fan-out/fan-in of judge results
//!
//! A [`JoinBarrier`] tracks how many of the expected per-judge results have
//! arrived for one request. It admits each `(request_id, judge_id)` pair at
//! most once and closes at most once, so a request yields at most one
//! [`ConsensusResult`] however often results are redelivered.

use super::consensus::{ConsensusResult, VoteDistribution};
use super::vote::JudgementResult;
use crate::review::RequestId;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One expected participant of a barrier, with its weight fixed at dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSlot {
    pub judge_id: String,
    pub weight: f64,
}

impl JudgeSlot {
    pub fn new(judge_id: impl Into<String>, weight: f64) -> Self {
        Self {
            judge_id: judge_id.into(),
            weight,
        }
    }
}

/// Dispatcher → Aggregator control message announcing a sub-task set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierAnnouncement {
    pub request_id: RequestId,
    pub session_id: SessionId,
    pub judges: Vec<JudgeSlot>,
    pub submitted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl BarrierAnnouncement {
    /// Build an announcement; repeated judge ids are collapsed to the first.
    pub fn new(
        request_id: RequestId,
        session_id: SessionId,
        judges: Vec<JudgeSlot>,
        submitted_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        let mut seen = HashSet::new();
        let judges = judges
            .into_iter()
            .filter(|slot| seen.insert(slot.judge_id.clone()))
            .collect();
        Self {
            request_id,
            session_id,
            judges,
            submitted_at,
            deadline,
        }
    }

    pub fn expected_count(&self) -> usize {
        self.judges.len()
    }
}

/// Outcome of offering a result to a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored; `complete` is true when this was the last expected result.
    Accepted { complete: bool },
    /// This judge already reported for this request.
    Duplicate,
    /// The judge is not part of this request's roster.
    UnknownJudge,
    /// The barrier already produced its consensus.
    Closed,
}

/// Aggregator-side state for one in-flight request.
#[derive(Debug, Clone)]
pub struct JoinBarrier {
    request_id: RequestId,
    session_id: SessionId,
    roster: Vec<JudgeSlot>,
    received: HashMap<String, JudgementResult>,
    submitted_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    closed: bool,
}

impl JoinBarrier {
    pub fn open(announcement: BarrierAnnouncement, now: DateTime<Utc>) -> Self {
        Self {
            request_id: announcement.request_id,
            session_id: announcement.session_id,
            roster: announcement.judges,
            received: HashMap::new(),
            submitted_at: announcement.submitted_at,
            created_at: now,
            deadline: announcement.deadline,
            closed: false,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn expected_count(&self) -> usize {
        self.roster.len()
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn is_complete(&self) -> bool {
        self.received.len() >= self.roster.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    fn weight_of(&self, judge_id: &str) -> f64 {
        self.roster
            .iter()
            .find(|slot| slot.judge_id == judge_id)
            .map(|slot| slot.weight)
            .unwrap_or(0.0)
    }

    /// Offer a result. Idempotent per judge id.
    pub fn admit(&mut self, result: JudgementResult) -> Admission {
        if self.closed {
            return Admission::Closed;
        }
        if !self.roster.iter().any(|slot| slot.judge_id == result.judge_id) {
            return Admission::UnknownJudge;
        }
        if self.received.contains_key(&result.judge_id) {
            return Admission::Duplicate;
        }
        self.received.insert(result.judge_id.clone(), result);
        Admission::Accepted {
            complete: self.is_complete(),
        }
    }

    /// Close the barrier and compute its consensus.
    ///
    /// Returns `None` if the barrier was already closed. Judges that did not
    /// report are listed in `missing_judges` and contribute nothing.
    pub fn close(&mut self, now: DateTime<Utc>, timed_out: bool) -> Option<ConsensusResult> {
        if self.closed {
            return None;
        }
        self.closed = true;

        let mut per_judge = Vec::with_capacity(self.received.len());
        let mut missing_judges = Vec::new();
        for slot in &self.roster {
            match self.received.get(&slot.judge_id) {
                Some(result) => per_judge.push(result.clone()),
                None => missing_judges.push(slot.judge_id.clone()),
            }
        }

        let distribution = VoteDistribution::tally(&per_judge, |judge| self.weight_of(judge));

        Some(ConsensusResult {
            request_id: self.request_id,
            session_id: self.session_id.clone(),
            decision: distribution.decision(),
            distribution,
            per_judge,
            missing_judges,
            timed_out,
            submitted_at: self.submitted_at,
            computed_at: now,
            elapsed_ms: (now - self.submitted_at).num_milliseconds(),
        })
    }
}
