//! Shared test doubles for conversation tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use convoform_core::{Embedder, GenerateRequest, GenerateResponse, LanguageModel, Result};
use convoform_engine::{FieldSpec, FieldType, FormSchema, FormValues};
use parking_lot::Mutex;
use serde_json::Value;

/// Completion oracle driven by queued answers
///
/// Extraction prompts pop the extraction queue (`{}` when empty), YES/NO
/// prompts pop the confirmation queue (`NO` when empty). Reply prompts get
/// a short deterministic text derived from the prompt.
#[derive(Default)]
pub struct ScriptedLlm {
    extractions: Mutex<VecDeque<String>>,
    confirmations: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_extraction(&self, json: Value) {
        self.extractions.lock().push_back(json.to_string());
    }

    pub fn push_raw_extraction(&self, text: &str) {
        self.extractions.lock().push_back(text.to_string());
    }

    pub fn push_confirmation(&self, answer: &str) {
        self.confirmations.lock().push_back(answer.to_string());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn last_prompt_containing(&self, needle: &str) -> Option<String> {
        self.prompts.lock().iter().rev().find(|p| p.contains(needle)).cloned()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.prompts.lock().iter().filter(|p| p.contains(needle)).count()
    }

    fn answer(&self, prompt: &str) -> String {
        if prompt.starts_with("Update the following JSON") {
            return self.extractions.lock().pop_front().unwrap_or_else(|| "{}".to_string());
        }
        if prompt.starts_with("Given a sentence") {
            return self.confirmations.lock().pop_front().unwrap_or_else(|| "NO".to_string());
        }
        if prompt.starts_with("Identify the language") {
            return "English".to_string();
        }
        if let Some(rest) = after(prompt, "### missing information: ") {
            let field = rest.split_whitespace().next().unwrap_or_default();
            return format!("Could you tell me the {}?", field);
        }
        if let Some(error) = after(prompt, "### validation error: ") {
            return format!("Sorry: {}", error.lines().next().unwrap_or_default());
        }
        if prompt.contains("ask the user if they want to change something") {
            return "What would you like to change?".to_string();
        }
        if prompt.contains("Summarize the information contained in the form data.") {
            let data: Vec<&str> = prompt.lines().filter(|l| l.starts_with("- ")).collect();
            return format!("Summary:\n{}\nIs that right?", data.join("\n"));
        }
        "OK".to_string()
    }
}

fn after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker).map(|i| &text[i + marker.len()..])
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let prompt = request.user_text();
        self.prompts.lock().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(GenerateResponse::text(self.answer(&prompt)))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Bag-of-words embedder; each distinct word gets its own dimension
pub struct BagOfWordsEmbedder {
    vocabulary: Mutex<Vec<String>>,
}

const BAG_DIMENSION: usize = 512;

impl BagOfWordsEmbedder {
    pub fn new() -> Self {
        Self {
            vocabulary: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; BAG_DIMENSION];
        let mut vocabulary = self.vocabulary.lock();

        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
        {
            let index = match vocabulary.iter().position(|v| v == word) {
                Some(i) => i,
                None => {
                    vocabulary.push(word.to_string());
                    vocabulary.len() - 1
                }
            };
            vector[index % BAG_DIMENSION] = 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        BAG_DIMENSION
    }
}

/// Records every action invocation
#[derive(Clone, Default)]
pub struct ActionProbe {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<FormValues>>>,
}

impl ActionProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_values(&self) -> Option<FormValues> {
        self.last.lock().clone()
    }

    pub fn action(&self) -> impl Fn(&FormValues) -> String + Send + Sync + 'static {
        let probe = self.clone();
        move |values: &FormValues| {
            probe.calls.fetch_add(1, Ordering::SeqCst);
            *probe.last.lock() = Some(values.clone());
            format!("registered {}", values.display("name"))
        }
    }
}

/// `{name, email}` signup form
pub fn signup_schema() -> FormSchema {
    FormSchema::new("signup", "a user registration form")
        .field(FieldSpec::text("name", "the user's name").example("I'm Bob", serde_json::json!("Bob")))
        .field(FieldSpec::new("email", FieldType::Email, "the user's e-mail address"))
}

pub fn pizza_schema() -> FormSchema {
    FormSchema::new("pizza_order", "a pizza order")
        .field(FieldSpec::enumeration("pizza_type", "the pizza to order", ["Margherita", "Diavola", "Capricciosa"]))
        .field(FieldSpec::text("address", "the delivery address"))
}
