//! Exposes any [`LlmBackend`] as the core [`LanguageModel`]

use std::sync::Arc;

use async_trait::async_trait;
use convoform_core::{Error, GenerateRequest, GenerateResponse, LanguageModel, Result, TokenUsage};

use crate::backend::LlmBackend;

/// Wraps a backend so the engine can use it as its completion oracle
///
/// ```ignore
/// let backend = OllamaBackend::new(config)?;
/// let llm: Arc<dyn LanguageModel> = Arc::new(LanguageModelAdapter::new(backend));
/// ```
pub struct LanguageModelAdapter {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
}

impl LanguageModelAdapter {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self { backend, model_name }
    }
}

#[async_trait]
impl LanguageModel for LanguageModelAdapter {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let result = self.backend.generate(&request).await.map_err(Error::from)?;

        let response = GenerateResponse {
            text: result.text,
            finish_reason: result.finish_reason,
            usage: Some(TokenUsage::new(result.prompt_tokens as u32, result.tokens as u32)),
        };
        if response.is_truncated() {
            tracing::warn!(model = %self.model_name, tokens = result.tokens, "Completion hit the token limit");
        }
        Ok(response)
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
