//! Weighted Quorum consensus
//!
//! Each received non-error result contributes `weight × confidence` to its
//! decision bucket. The heavier bucket wins; a tie resolves to
//! [`Decision::Reject`]. With every weight and confidence equal to 1 this is
//! plain majority voting where a split vote is rejected.

use super::vote::{Decision, JudgementResult, clamp_unit};
use crate::review::RequestId;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated weight per decision bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteDistribution {
    pub accept: f64,
    pub reject: f64,
}

impl VoteDistribution {
    /// Accumulate the contributions of `results`, looking up each judge's
    /// weight with `weight_of`. Error results contribute nothing.
    pub fn tally<'a>(
        results: impl IntoIterator<Item = &'a JudgementResult>,
        weight_of: impl Fn(&str) -> f64,
    ) -> Self {
        let mut distribution = Self::default();
        for result in results {
            if result.error.is_some() {
                continue;
            }
            let Some(decision) = result.decision else {
                continue;
            };
            let contribution =
                weight_of(&result.judge_id).max(0.0) * clamp_unit(result.confidence);
            match decision {
                Decision::Accept => distribution.accept += contribution,
                Decision::Reject => distribution.reject += contribution,
            }
        }
        distribution
    }

    /// The winning decision. Ties (including "no valid votes") reject.
    pub fn decision(&self) -> Decision {
        if self.accept > self.reject {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }

    pub fn total(&self) -> f64 {
        self.accept + self.reject
    }
}

/// The single terminal verdict for a review request
///
/// Produced once per request by the Aggregator, published to the session's
/// channel and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub request_id: RequestId,
    pub session_id: SessionId,
    pub decision: Decision,
    pub distribution: VoteDistribution,
    pub per_judge: Vec<JudgementResult>,
    /// Judges that never reported (only non-empty for timeout-derived results)
    pub missing_judges: Vec<String>,
    /// Set when the barrier deadline fired before every judge reported
    pub timed_out: bool,
    pub submitted_at: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl ConsensusResult {
    pub fn accepted(&self) -> bool {
        self.decision.is_accept()
    }

    /// Number of judges whose result was an error.
    pub fn error_count(&self) -> usize {
        self.per_judge.iter().filter(|r| r.is_error()).count()
    }

    /// Visual vote summary (e.g., "[●●○×]"); × marks an error.
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        for result in &self.per_judge {
            summary.push(match result.decision {
                _ if result.error.is_some() => '×',
                Some(Decision::Accept) => '●',
                Some(Decision::Reject) => '○',
                None => '×',
            });
        }
        summary.push(']');
        summary
    }
}
