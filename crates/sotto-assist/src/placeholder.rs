use crate::client::SuggestClient;
use async_trait::async_trait;
use sotto_core::AssistError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic local stand-in for a real generation backend. Useful for
/// wiring checks and tests; echoes the context it was given.
pub struct PlaceholderClient {
    calls: AtomicUsize,
}

impl PlaceholderClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for PlaceholderClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestClient for PlaceholderClient {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn complete(&self, context: &str) -> Result<String, AssistError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(format!("[mock LLM] Based on: {context}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_echoes_context() {
        let client = PlaceholderClient::new();
        let reply = client.complete("tell me more").await.unwrap();
        assert_eq!(reply, "[mock LLM] Based on: tell me more");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_placeholder_counts_calls() {
        let client = PlaceholderClient::new();
        client.complete("one").await.unwrap();
        client.complete("two").await.unwrap();
        assert_eq!(client.calls(), 2);
    }
}
