use async_trait::async_trait;
use sotto_core::config::AssistConfig;
use sotto_core::AssistError;
use std::sync::Arc;

/// A text-generation backend for suggestions.
///
/// `complete` takes a transcript snippet and returns the raw suggestion
/// text. Callers own trimming, deduplication and parsing.
#[async_trait]
pub trait SuggestClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, context: &str) -> Result<String, AssistError>;
}

pub fn client_from_config(cfg: &AssistConfig) -> Result<Arc<dyn SuggestClient>, AssistError> {
    match cfg.client.as_str() {
        "openai" => Ok(Arc::new(crate::openai::OpenAiClient::new(cfg))),
        "placeholder" => Ok(Arc::new(crate::placeholder::PlaceholderClient::new())),
        other => Err(AssistError::ClientNotFound(other.to_string())),
    }
}
