//! Runtime parameters for the pipeline components.
//!
//! These are application-layer concerns (timeouts, pool sizes, retention),
//! not domain policy. Infrastructure builds them from the loaded file config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Dispatcher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchParams {
    /// How long a barrier waits for its judges before emitting a partial consensus.
    pub barrier_timeout: Duration,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            barrier_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatchParams {
    pub fn with_barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = timeout;
        self
    }
}

/// Aggregator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorParams {
    /// Period of the deadline sweep.
    pub sweep_interval: Duration,
    /// How long a result whose barrier has not arrived yet is kept.
    pub orphan_ttl: Duration,
    /// How long a completed request id is remembered to drop late redeliveries.
    pub completed_retention: Duration,
}

impl Default for AggregatorParams {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(500),
            orphan_ttl: Duration::from_secs(5),
            completed_retention: Duration::from_secs(120),
        }
    }
}

impl AggregatorParams {
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_orphan_ttl(mut self, ttl: Duration) -> Self {
        self.orphan_ttl = ttl;
        self
    }

    pub fn with_completed_retention(mut self, retention: Duration) -> Self {
        self.completed_retention = retention;
        self
    }
}

/// What a judge worker emits when the model answered but no decision could be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDecisionPolicy {
    /// Emit an error result (excluded from the weighted vote)
    #[default]
    Error,
    /// Count it as a rejection at default confidence
    Reject,
}

impl fmt::Display for MissingDecisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDecisionPolicy::Error => write!(f, "error"),
            MissingDecisionPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for MissingDecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(MissingDecisionPolicy::Error),
            "reject" => Ok(MissingDecisionPolicy::Reject),
            other => Err(format!(
                "unknown missing-decision policy '{}' (expected 'error' or 'reject')",
                other
            )),
        }
    }
}

/// Judge worker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerParams {
    /// Number of concurrent workers consuming sub-tasks.
    pub pool_size: usize,
    /// Upper bound on a single model invocation.
    pub invoke_timeout: Duration,
    pub missing_decision: MissingDecisionPolicy,
}

impl Default for WorkerParams {
    fn default() -> Self {
        Self {
            pool_size: 4,
            invoke_timeout: Duration::from_secs(60),
            missing_decision: MissingDecisionPolicy::default(),
        }
    }
}

impl WorkerParams {
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    pub fn with_missing_decision(mut self, policy: MissingDecisionPolicy) -> Self {
        self.missing_decision = policy;
        self
    }
}
