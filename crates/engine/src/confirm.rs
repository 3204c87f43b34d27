//! Confirmation and exit-intent oracles
//!
//! Two interchangeable confirmation strategies sit behind
//! [`ConfirmationOracle`]: a strict YES/NO prompt, and nearest-neighbour
//! lookup against labelled example utterances. Both answer "not confirmed"
//! whenever they are unsure or the backing service fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use convoform_core::{cosine_similarity, Embedder, LanguageModel, Result};
use parking_lot::Mutex;

use crate::oracle::complete_within;
use crate::prompts::{self, PromptContext};

pub const CONFIRM_LABEL: &str = "confirm";
pub const DENY_LABEL: &str = "deny";
pub const EXIT_LABEL: &str = "exit";

/// Decides whether an utterance confirms the summary
#[async_trait]
pub trait ConfirmationOracle: Send + Sync {
    async fn confirm(&self, ctx: &PromptContext<'_>) -> bool;
}

/// Ask the completion oracle a strict YES/NO question
pub struct PromptConfirmation {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl PromptConfirmation {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl ConfirmationOracle for PromptConfirmation {
    async fn confirm(&self, ctx: &PromptContext<'_>) -> bool {
        let prompt = match &ctx.schema.hooks().confirm_prompt {
            Some(hook) => hook(ctx),
            None => prompts::confirm_prompt(ctx),
        };

        match complete_within(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(response) => {
                let confirmed = parse_yes_no(&response);
                tracing::debug!(form = ctx.schema.key(), response = %response, confirmed, "Confirmation answer");
                confirmed
            }
            Err(e) => {
                tracing::warn!(form = ctx.schema.key(), error = %e, "Confirmation failed, assuming not confirmed");
                false
            }
        }
    }
}

/// True only for an unambiguous YES: a YES token and no NO token
pub fn parse_yes_no(response: &str) -> bool {
    let mut yes = false;
    for word in response.split(|c: char| !c.is_alphanumeric()) {
        if word.eq_ignore_ascii_case("no") {
            return false;
        }
        if word.eq_ignore_ascii_case("yes") {
            yes = true;
        }
    }
    yes
}

/// An example utterance with its label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub text: String,
    pub label: String,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Closest example to an utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Nearest {
    pub label: String,
    pub score: f32,
}

/// Nearest-neighbour lookup over labelled examples
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    async fn nearest(&self, utterance: &str, examples: &[LabeledExample]) -> Result<Option<Nearest>>;
}

/// Cosine similarity over embeddings; example vectors are computed once
pub struct EmbeddingSimilarity {
    embedder: Arc<dyn Embedder>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingSimilarity {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn example_vectors(&self, examples: &[LabeledExample]) -> Result<Vec<Vec<f32>>> {
        let uncached: Vec<&str> = {
            let cache = self.cache.lock();
            examples
                .iter()
                .map(|e| e.text.as_str())
                .filter(|text| !cache.contains_key(*text))
                .collect()
        };

        if !uncached.is_empty() {
            let vectors = self.embedder.embed_batch(&uncached).await?;
            let mut cache = self.cache.lock();
            for (text, vector) in uncached.into_iter().zip(vectors) {
                cache.insert(text.to_string(), vector);
            }
        }

        let cache = self.cache.lock();
        Ok(examples
            .iter()
            .map(|e| cache.get(&e.text).cloned().unwrap_or_default())
            .collect())
    }
}

#[async_trait]
impl SimilarityOracle for EmbeddingSimilarity {
    async fn nearest(&self, utterance: &str, examples: &[LabeledExample]) -> Result<Option<Nearest>> {
        if examples.is_empty() {
            return Ok(None);
        }

        let query = self.embedder.embed(utterance).await?;
        let vectors = self.example_vectors(examples).await?;

        Ok(examples
            .iter()
            .zip(vectors.iter())
            .map(|(example, vector)| Nearest {
                label: example.label.clone(),
                score: cosine_similarity(&query, vector),
            })
            .max_by(|a, b| a.score.total_cmp(&b.score)))
    }
}

/// Built-in confirmation examples
pub fn default_confirm_examples() -> Vec<LabeledExample> {
    [
        ("yes, they are correct", CONFIRM_LABEL),
        ("ok, they are fine", CONFIRM_LABEL),
        ("they seem right", CONFIRM_LABEL),
        ("I think so", CONFIRM_LABEL),
        ("no, we are not there", DENY_LABEL),
        ("wrong", DENY_LABEL),
        ("they are not correct", DENY_LABEL),
        ("I don't think so", DENY_LABEL),
    ]
    .into_iter()
    .map(|(text, label)| LabeledExample::new(text, label))
    .collect()
}

/// Built-in "leave the form" examples
pub fn default_exit_examples() -> Vec<LabeledExample> {
    [
        "I would like to exit the module",
        "I no longer want to continue filling out the form",
        "You go out",
        "Return to normal conversation",
        "Stop and go out",
    ]
    .into_iter()
    .map(|text| LabeledExample::new(text, EXIT_LABEL))
    .collect()
}

/// Top-1 label of the nearest labelled example
pub struct SimilarityConfirmation {
    oracle: Arc<dyn SimilarityOracle>,
    examples: Vec<LabeledExample>,
}

impl SimilarityConfirmation {
    pub fn new(oracle: Arc<dyn SimilarityOracle>) -> Self {
        Self::with_examples(oracle, default_confirm_examples())
    }

    pub fn with_examples(oracle: Arc<dyn SimilarityOracle>, examples: Vec<LabeledExample>) -> Self {
        Self { oracle, examples }
    }
}

#[async_trait]
impl ConfirmationOracle for SimilarityConfirmation {
    async fn confirm(&self, ctx: &PromptContext<'_>) -> bool {
        match self.oracle.nearest(ctx.utterance, &self.examples).await {
            Ok(Some(nearest)) => {
                tracing::debug!(form = ctx.schema.key(), label = %nearest.label, score = nearest.score, "Nearest confirmation example");
                nearest.label == CONFIRM_LABEL
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(form = ctx.schema.key(), error = %e, "Similarity confirmation failed, assuming not confirmed");
                false
            }
        }
    }
}

/// Detects a request to leave the form
pub struct ExitIntentDetector {
    oracle: Arc<dyn SimilarityOracle>,
    examples: Vec<LabeledExample>,
    threshold: f32,
}

impl ExitIntentDetector {
    pub fn new(oracle: Arc<dyn SimilarityOracle>, threshold: f32) -> Self {
        Self {
            oracle,
            examples: default_exit_examples(),
            threshold,
        }
    }

    pub fn with_examples(mut self, examples: Vec<LabeledExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Nearest exit example scores at or above the threshold
    pub async fn is_exit(&self, utterance: &str) -> bool {
        match self.oracle.nearest(utterance, &self.examples).await {
            Ok(Some(nearest)) => nearest.score >= self.threshold,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Exit intent check failed");
                false
            }
        }
    }
}
