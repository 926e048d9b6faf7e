//! Judge directory port
//!
//! Read-only view of the external judge configuration store.

use async_trait::async_trait;
use magi_domain::JudgeConfig;
use thiserror::Error;

/// Errors that can occur while listing judges
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Judge directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of judge configuration
#[async_trait]
pub trait JudgeDirectory: Send + Sync {
    /// List the currently active judges.
    ///
    /// The returned vector is a snapshot; later configuration changes must not
    /// affect a dispatch that already holds it.
    async fn active_judges(&self) -> Result<Vec<JudgeConfig>, DirectoryError>;
}
