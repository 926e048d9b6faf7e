//! Judge directory backed by an in-memory list.
//!
//! Populated from the `[[judges]]` configuration at startup; `replace` swaps
//! the whole panel at once so a concurrent reader sees either the old or the
//! new set, never a mix.

use async_trait::async_trait;
use magi_application::ports::judge_directory::{DirectoryError, JudgeDirectory};
use magi_domain::JudgeConfig;
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct StaticJudgeDirectory {
    judges: RwLock<Arc<Vec<JudgeConfig>>>,
}

impl StaticJudgeDirectory {
    pub fn new(judges: Vec<JudgeConfig>) -> Self {
        Self {
            judges: RwLock::new(Arc::new(judges)),
        }
    }

    /// Swap in a new panel.
    pub fn replace(&self, judges: Vec<JudgeConfig>) {
        info!("Judge panel replaced ({} judges)", judges.len());
        *self.judges.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(judges);
    }

    /// Every configured judge, active or not.
    pub fn all(&self) -> Arc<Vec<JudgeConfig>> {
        Arc::clone(&self.judges.read().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl JudgeDirectory for StaticJudgeDirectory {
    async fn active_judges(&self) -> Result<Vec<JudgeConfig>, DirectoryError> {
        Ok(self
            .all()
            .iter()
            .filter(|judge| judge.active)
            .cloned()
            .collect())
    }
}
