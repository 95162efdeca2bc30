use crate::client::SuggestClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sotto_core::config::AssistConfig;
use sotto_core::AssistError;

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 384;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(cfg: &AssistConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            system_prompt: cfg.system_prompt.clone(),
        }
    }

    fn build_request(&self, context: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Live transcript snippet:\n{context}"),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl SuggestClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, context: &str) -> Result<String, AssistError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, "sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(context))
            .send()
            .await
            .map_err(|e| AssistError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistError::RequestFailed(format!(
                "status {status}: {body}"
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistError::MalformedResponse("no choices in response".to_string()))
    }
}
