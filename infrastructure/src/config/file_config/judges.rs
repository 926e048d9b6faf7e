//! Judge panel configuration from TOML (`[[judges]]` array)

use magi_domain::review::judge::DEFAULT_PROMPT_TEMPLATE;
use magi_domain::{JudgeConfig, ModelParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileJudgeConfig {
    pub id: String,
    /// Display name (defaults to the id)
    pub name: Option<String>,
    pub weight: f64,
    pub system_prompt: String,
    /// User prompt with a `{payload}` placeholder
    pub prompt_template: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
    /// Per-judge model override
    pub model: Option<String>,
    pub active: bool,
}

impl Default for FileJudgeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: None,
            weight: 1.0,
            system_prompt: String::new(),
            prompt_template: None,
            temperature: 0.7,
            max_tokens: None,
            stop: Vec::new(),
            model: None,
            active: true,
        }
    }
}

impl FileJudgeConfig {
    pub fn to_judge_config(&self) -> JudgeConfig {
        let mut judge = JudgeConfig::new(self.id.trim(), self.weight)
            .with_system_prompt(self.system_prompt.clone())
            .with_prompt_template(
                self.prompt_template
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
            )
            .with_params(ModelParams {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                stop: self.stop.clone(),
            });
        if let Some(name) = &self.name {
            judge = judge.with_name(name.clone());
        }
        if !self.active {
            judge = judge.inactive();
        }
        judge
    }
}

fn persona(id: &str, name: &str, focus: &str) -> FileJudgeConfig {
    FileJudgeConfig {
        id: id.to_string(),
        name: Some(name.to_string()),
        system_prompt: format!(
            "You are {name}, one of three independent reviewers. Judge the submission strictly on {focus}."
        ),
        ..Default::default()
    }
}

/// The panel used when no `[[judges]]` are configured.
pub fn default_panel() -> Vec<FileJudgeConfig> {
    vec![
        persona(
            "melchior",
            "MELCHIOR-1",
            "architecture, structure and long-term maintainability",
        ),
        persona(
            "balthasar",
            "BALTHASAR-2",
            "security, input handling and failure behaviour",
        ),
        persona(
            "casper",
            "CASPER-3",
            "correctness, completeness and practical usefulness",
        ),
    ]
}
