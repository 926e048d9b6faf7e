//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod judge_directory;
pub mod llm_gateway;
pub mod transport;
