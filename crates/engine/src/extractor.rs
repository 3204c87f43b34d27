//! Candidate extraction through the completion oracle
//!
//! The prompt uses a few-shot "Sentence / JSON / Updated JSON" layout. The
//! oracle answers with the updated object; anything that is not a JSON
//! object counts as "no update".

use std::sync::Arc;
use std::time::Duration;

use convoform_core::LanguageModel;
use serde_json::{Map, Value};

use crate::oracle::complete_within;
use crate::schema::FormSchema;
use crate::values::FormValues;

/// Turns an utterance into a candidate update
#[derive(Clone)]
pub struct Extractor {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Ask the oracle for the updated values
    ///
    /// Returns `None` on oracle failure, timeout or unparsable output.
    pub async fn extract(
        &self,
        utterance: &str,
        schema: &FormSchema,
        current: &FormValues,
    ) -> Option<Map<String, Value>> {
        let prompt = build_prompt(schema, current, utterance);
        tracing::debug!(form = schema.key(), prompt_len = prompt.len(), "Extraction prompt");

        let response = match complete_within(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(form = schema.key(), error = %e, "Extraction failed, treating as no update");
                return None;
            }
        };

        let parsed = parse_json_object(&response);
        if parsed.is_none() {
            tracing::warn!(form = schema.key(), response_len = response.len(), "Extraction output is not a JSON object");
            tracing::debug!(form = schema.key(), response = %response, "Unparsable extraction output");
        }
        parsed
    }
}

/// Build the few-shot extraction prompt
pub fn build_prompt(schema: &FormSchema, current: &FormValues, utterance: &str) -> String {
    let mut prompt =
        String::from("Update the following JSON with information extracted from the Sentence:\n\n");

    prompt.push_str("Fields:\n");
    for field in schema.fields() {
        prompt.push_str(&format!("- {}: {}", field.name, field.description));
        if let Some(values) = field.allowed_values() {
            prompt.push_str(&format!(" (one of: {})", values.join(", ")));
        }
        prompt.push('\n');
    }
    prompt.push('\n');

    let blank = FormValues::empty(schema.field_names());
    for field in schema.fields() {
        for example in &field.examples {
            let mut updated = blank.clone();
            updated.set(field.name.clone(), example.value.clone());

            prompt.push_str(&format!(
                "Sentence: {}\nJSON: {}\nUpdated JSON: {}\n\n",
                example.utterance,
                pretty(&blank),
                pretty(&updated)
            ));
        }
    }

    prompt.push_str(&format!(
        "Sentence: {}\nJSON: {}\nUpdated JSON:",
        utterance,
        pretty(current)
    ));
    prompt
}

fn pretty(values: &FormValues) -> String {
    serde_json::to_string_pretty(values.as_map()).unwrap_or_else(|_| "{}".to_string())
}

/// Parse the first balanced JSON object in `text`
///
/// Tolerates Markdown code fences and prose around the object. A brace in
/// prose that does not open valid JSON is skipped.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let slice = balanced_object(&text[start..])?;
        match serde_json::from_str::<Value>(slice) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// `text` starts with `{`; returns it up to the matching `}`
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}
