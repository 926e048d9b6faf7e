//! Pipeline tuning from TOML (`[dispatch]`, `[aggregator]`, `[workers]`)

use magi_application::{AggregatorParams, DispatchParams, MissingDecisionPolicy, WorkerParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    /// Seconds a barrier waits before emitting a partial consensus
    pub barrier_timeout_secs: u64,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        Self {
            barrier_timeout_secs: 30,
        }
    }
}

impl FileDispatchConfig {
    pub fn to_params(&self) -> DispatchParams {
        DispatchParams::default().with_barrier_timeout(Duration::from_secs(self.barrier_timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAggregatorConfig {
    pub sweep_interval_ms: u64,
    pub orphan_ttl_secs: u64,
    pub completed_retention_secs: u64,
}

impl Default for FileAggregatorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 500,
            orphan_ttl_secs: 5,
            completed_retention_secs: 120,
        }
    }
}

impl FileAggregatorConfig {
    pub fn to_params(&self) -> AggregatorParams {
        AggregatorParams::default()
            .with_sweep_interval(Duration::from_millis(self.sweep_interval_ms))
            .with_orphan_ttl(Duration::from_secs(self.orphan_ttl_secs))
            .with_completed_retention(Duration::from_secs(self.completed_retention_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkersConfig {
    pub pool_size: usize,
    pub invoke_timeout_secs: u64,
    /// `error` or `reject`
    pub missing_decision: MissingDecisionPolicy,
}

impl Default for FileWorkersConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            invoke_timeout_secs: 60,
            missing_decision: MissingDecisionPolicy::Error,
        }
    }
}

impl FileWorkersConfig {
    pub fn to_params(&self) -> WorkerParams {
        WorkerParams::default()
            .with_pool_size(self.pool_size)
            .with_invoke_timeout(Duration::from_secs(self.invoke_timeout_secs))
            .with_missing_decision(self.missing_decision)
    }
}
