//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain/application
//! types with the `to_*` methods.

mod gateway;
mod judges;
mod pipeline;
mod provider;

pub use gateway::{DEFAULT_SECRET, FileGatewayConfig};
pub use judges::{FileJudgeConfig, default_panel};
pub use pipeline::{FileAggregatorConfig, FileDispatchConfig, FileWorkersConfig};
pub use provider::FileProviderConfig;

use magi_domain::JudgeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("gateway.secret cannot be empty")]
    EmptySecret,

    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("judge id cannot be empty")]
    EmptyJudgeId,

    #[error("duplicate judge id '{0}'")]
    DuplicateJudgeId(String),

    #[error("judge '{id}' has invalid weight {weight}")]
    InvalidWeight { id: String, weight: f64 },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub gateway: FileGatewayConfig,
    pub dispatch: FileDispatchConfig,
    pub aggregator: FileAggregatorConfig,
    pub workers: FileWorkersConfig,
    pub provider: FileProviderConfig,
    /// Judge panel; a configured array replaces the built-in panel entirely
    pub judges: Vec<FileJudgeConfig>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            gateway: FileGatewayConfig::default(),
            dispatch: FileDispatchConfig::default(),
            aggregator: FileAggregatorConfig::default(),
            workers: FileWorkersConfig::default(),
            provider: FileProviderConfig::default(),
            judges: default_panel(),
        }
    }
}

impl FileConfig {
    /// Validate the configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.gateway.secret.trim().is_empty() {
            return Err(ConfigValidationError::EmptySecret);
        }

        let zero_checks: [(&'static str, u64); 6] = [
            ("gateway.token_window_secs", self.gateway.token_window_secs),
            ("dispatch.barrier_timeout_secs", self.dispatch.barrier_timeout_secs),
            ("aggregator.sweep_interval_ms", self.aggregator.sweep_interval_ms),
            ("aggregator.orphan_ttl_secs", self.aggregator.orphan_ttl_secs),
            ("workers.invoke_timeout_secs", self.workers.invoke_timeout_secs),
            ("workers.pool_size", self.workers.pool_size as u64),
        ];
        if let Some((field, _)) = zero_checks.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroValue(*field));
        }

        let mut seen = HashSet::new();
        for judge in &self.judges {
            let id = judge.id.trim();
            if id.is_empty() {
                return Err(ConfigValidationError::EmptyJudgeId);
            }
            if !seen.insert(id) {
                return Err(ConfigValidationError::DuplicateJudgeId(id.to_string()));
            }
            if !judge.weight.is_finite() || judge.weight < 0.0 {
                return Err(ConfigValidationError::InvalidWeight {
                    id: id.to_string(),
                    weight: judge.weight,
                });
            }
        }

        Ok(())
    }

    /// Convert the `[[judges]]` entries into domain judge configs.
    pub fn judge_configs(&self) -> Vec<JudgeConfig> {
        self.judges
            .iter()
            .map(FileJudgeConfig::to_judge_config)
            .collect()
    }
}
