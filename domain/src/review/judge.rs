//! Judge configuration
//!
//! Judge records are owned by an external configuration store; the core only
//! reads them, once per dispatch.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Default user prompt template when a judge does not define one.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Review the following content:\n\n{payload}";

/// Generation parameters passed through to the model capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Model override for this judge (None = provider default)
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: None,
            stop: Vec::new(),
        }
    }
}

/// A configured persona + model pairing that renders one vote per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub judge_id: String,
    pub name: Option<String>,
    pub weight: f64,
    pub system_prompt: String,
    pub prompt_template: String,
    pub params: ModelParams,
    pub active: bool,
}

impl JudgeConfig {
    pub fn new(judge_id: impl Into<String>, weight: f64) -> Self {
        Self {
            judge_id: judge_id.into(),
            name: None,
            weight,
            system_prompt: String::new(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            params: ModelParams::default(),
            active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.judge_id)
    }

    /// Weights must be finite and non-negative.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(DomainError::InvalidWeight {
                judge_id: self.judge_id.clone(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}
