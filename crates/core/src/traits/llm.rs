//! Completion oracle

use async_trait::async_trait;

use crate::{GenerateRequest, GenerateResponse, Result};

/// Something that turns a prompt into text
///
/// `convoform-llm` provides one over Ollama; tests script their own.
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = create_language_model(&settings.llm)?;
/// let reply = llm.complete("Answer YES or NO: is 'sure' a yes?").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Health probe, false when the server cannot be reached
    async fn is_available(&self) -> bool;

    fn model_name(&self) -> &str;

    /// Complete a single free-text prompt
    ///
    /// Every prompt the form engine sends goes through here.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.generate(GenerateRequest::from_prompt(prompt)).await?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text(format!("echo: {}", request.user_text())))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_complete_wraps_prompt_as_user_message() {
        let llm = EchoLlm;
        assert!(llm.is_available().await);

        let text = llm.complete("hello").await.unwrap();
        assert_eq!(text, "echo: hello");
    }
}
