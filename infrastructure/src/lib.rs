//! Infrastructure layer for magi-quorum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod judges;
pub mod llm;
pub mod transport;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use judges::StaticJudgeDirectory;
#[cfg(feature = "openai")]
pub use llm::OpenAiGateway;
pub use transport::InMemoryTransport;
