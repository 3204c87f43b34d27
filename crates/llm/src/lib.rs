//! Completion and embedding backends for the form engine
//!
//! Both backends speak to Ollama over HTTP and are exposed to the engine
//! through the core `LanguageModel` and `Embedder` traits.

pub mod adapter;
pub mod backend;
pub mod embeddings;
pub mod factory;

pub use adapter::LanguageModelAdapter;
pub use backend::{GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
pub use factory::{create_embedder, create_language_model};

use thiserror::Error;

/// Failures talking to a model server
#[derive(Error, Debug)]
pub enum LlmError {
    /// Non-retryable 4xx answer
    #[error("API error: {0}")]
    Api(String),

    /// Connection failure or 5xx
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LlmError::Timeout;
        }
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for convoform_core::Error {
    fn from(err: LlmError) -> Self {
        use convoform_core::Error;

        match err {
            LlmError::InvalidResponse(msg) => Error::InvalidResponse(msg),
            LlmError::Configuration(msg) => Error::Config(msg),
            other => Error::Llm(other.to_string()),
        }
    }
}
