//! Bounded completion-oracle calls

use std::time::Duration;

use convoform_core::{Error, LanguageModel, Result};

/// Complete a prompt, giving up after `timeout`
pub async fn complete_within(llm: &dyn LanguageModel, prompt: &str, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, llm.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
    }
}
