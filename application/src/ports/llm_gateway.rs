//! LLM Gateway port
//!
//! Defines the interface for invoking the generative-model capability. The
//! capability is a black box: given a persona and a prompt it returns raw
//! text or fails. Turning that text into a decision is the judge worker's job.

use async_trait::async_trait;
use magi_domain::ModelParams;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// One model call: persona, rendered prompt and generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub params: &'a ModelParams,
}

/// Gateway for LLM communication
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn invoke(&self, invocation: Invocation<'_>) -> Result<String, GatewayError>;
}
