//! Reply language detection

use std::sync::Arc;
use std::time::Duration;

use convoform_config::constants::form::DEFAULT_LANGUAGE;
use convoform_core::LanguageModel;

use crate::oracle::complete_within;
use crate::prompts::language_prompt;

/// Longest answer still taken as a language name
const MAX_LANGUAGE_LEN: usize = 32;

/// Asks the completion oracle which language an utterance is in
#[derive(Clone)]
pub struct LanguageDetector {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LanguageDetector {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Detected language name, or the default when the answer is unusable
    pub async fn detect(&self, utterance: &str) -> String {
        match complete_within(self.llm.as_ref(), &language_prompt(utterance), self.timeout).await {
            Ok(response) => clean_language(&response).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Language detection failed, using default");
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }
}

/// First line of the answer without quotes or punctuation
fn clean_language(response: &str) -> Option<String> {
    let line = response.lines().map(str::trim).find(|l| !l.is_empty())?;
    let cleaned = line
        .trim_matches(|c: char| c == '\'' || c == '"' || c == '.' || c == '`')
        .trim();

    let plausible = !cleaned.is_empty()
        && cleaned.len() <= MAX_LANGUAGE_LEN
        && cleaned.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-');
    plausible.then(|| cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convoform_core::{Error, GenerateRequest, GenerateResponse, Result};

    struct FixedLlm(Result<String>);

    #[async_trait]
    impl LanguageModel for FixedLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
            self.0.clone().map(GenerateResponse::text)
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_clean_language() {
        assert_eq!(clean_language("'Italian'").as_deref(), Some("Italian"));
        assert_eq!(clean_language("\n  French.\n").as_deref(), Some("French"));
        assert_eq!(clean_language("The language is {unknown}: 42"), None);
        assert_eq!(clean_language(""), None);
    }

    #[tokio::test]
    async fn test_detect() {
        let detector = LanguageDetector::new(Arc::new(FixedLlm(Ok("Italian".into()))), Duration::from_secs(1));
        assert_eq!(detector.detect("Ciao").await, "Italian");

        let failing = LanguageDetector::new(
            Arc::new(FixedLlm(Err(Error::Llm("down".into())))),
            Duration::from_secs(1),
        );
        assert_eq!(failing.detect("Ciao").await, "English");
    }
}
