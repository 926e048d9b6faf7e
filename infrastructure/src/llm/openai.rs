//! OpenAI-compatible chat completions gateway.
//!
//! Works against any endpoint that speaks the `/chat/completions` protocol
//! (OpenAI, OpenRouter, vLLM, Ollama's compatibility layer, ...).

use async_trait::async_trait;
use magi_application::ports::llm_gateway::{GatewayError, Invocation, LlmGateway};
use serde_json::{Value, json};
use tracing::debug;

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            max_tokens: None,
        }
    }

    /// Fallback `max_tokens` for judges that do not set one.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, invocation: &Invocation<'_>) -> Value {
        let params = invocation.params;
        let mut body = json!({
            "model": params.model.as_deref().unwrap_or(&self.model),
            "messages": [
                { "role": "system", "content": invocation.system_prompt },
                { "role": "user", "content": invocation.user_prompt },
            ],
            "temperature": params.temperature,
        });
        if let Some(max_tokens) = params.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }
        if !params.stop.is_empty() {
            body["stop"] = json!(params.stop);
        }
        body
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_content(response: &Value) -> Result<String, GatewayError> {
    response
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::InvalidResponse("response missing message content".to_string()))
}

fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn invoke(&self, invocation: Invocation<'_>) -> Result<String, GatewayError> {
        let body = self.request_body(&invocation);
        debug!("POST {} (model {})", self.endpoint(), body["model"]);

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::ModelNotAvailable(
                body["model"].as_str().unwrap_or_default().to_string(),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::RequestFailed(format!(
                "chat API error (status {}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        extract_content(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magi_domain::ModelParams;

    fn gateway() -> OpenAiGateway {
        OpenAiGateway::new("https://api.example.com/v1/", None, "gpt-4o-mini")
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        assert_eq!(
            gateway().endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_carries_params() {
        let params = ModelParams {
            model: Some("judge-model".to_string()),
            temperature: 0.2,
            max_tokens: Some(256),
            stop: vec!["</reasoning>".to_string()],
        };
        let invocation = Invocation {
            system_prompt: "persona",
            user_prompt: "prompt",
            params: &params,
        };
        let body = gateway().request_body(&invocation);

        assert_eq!(body["model"], "judge-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "persona");
        assert_eq!(body["messages"][1]["content"], "prompt");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stop"][0], "</reasoning>");
    }

    #[test]
    fn test_request_body_falls_back_to_gateway_defaults() {
        let params = ModelParams::default();
        let invocation = Invocation {
            system_prompt: "persona",
            user_prompt: "prompt",
            params: &params,
        };
        let body = gateway()
            .with_max_tokens(Some(1024))
            .request_body(&invocation);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1024);
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn test_extract_content() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "<decision>POSITIVE</decision>" } }]
        });
        assert_eq!(
            extract_content(&response).unwrap(),
            "<decision>POSITIVE</decision>"
        );
        assert!(matches!(
            extract_content(&json!({ "choices": [] })),
            Err(GatewayError::InvalidResponse(_))
        ));
    }
}
