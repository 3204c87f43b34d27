//! Backend factories
//!
//! Build the completion oracle and embedder from settings.
//!
//! ## Example
//! ```ignore
//! let settings = load_settings(None)?;
//! let llm = create_language_model(&settings.llm)?;
//! ```

use std::sync::Arc;

use convoform_config::{EmbeddingSettings, LlmProvider, LlmSettings};
use convoform_core::{Embedder, LanguageModel};

use crate::{
    adapter::LanguageModelAdapter,
    backend::{LlmConfig, OllamaBackend},
    embeddings::{OllamaEmbedder, OllamaEmbeddingConfig},
    LlmError,
};

/// Create the completion oracle configured in settings
pub fn create_language_model(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>, LlmError> {
    match settings.provider {
        LlmProvider::Ollama => {
            let backend = OllamaBackend::new(LlmConfig::from(settings))?;
            tracing::info!(
                model = %settings.model,
                endpoint = %settings.endpoint,
                "Created Ollama language model"
            );
            Ok(Arc::new(LanguageModelAdapter::new(backend)))
        }
    }
}

/// Create the embedder used by similarity strategies
pub fn create_embedder(settings: &EmbeddingSettings) -> Arc<dyn Embedder> {
    tracing::info!(model = %settings.model, "Created Ollama embedder");
    Arc::new(OllamaEmbedder::new(OllamaEmbeddingConfig::from(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_language_model() {
        let mut settings = LlmSettings::default();
        settings.model = "llama3".to_string();

        let llm = create_language_model(&settings).unwrap();
        assert_eq!(llm.model_name(), "llama3");
    }

    #[test]
    fn test_create_embedder() {
        let mut settings = EmbeddingSettings::default();
        settings.dimension = 384;

        let embedder = create_embedder(&settings);
        assert_eq!(embedder.dimension(), 384);
    }
}
