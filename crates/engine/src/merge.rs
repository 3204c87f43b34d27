//! Merge and validation of candidate updates
//!
//! A candidate is overlaid on the current values, never erasing a filled
//! field. The combined values are validated field by field; any invalid
//! field rejects the whole candidate.

use serde_json::{Map, Value};

use crate::schema::FormSchema;
use crate::values::{is_empty_value, FormValues};

/// Result of merging one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Values after the merge; the current values when unchanged or rejected
    pub values: FormValues,
    /// Required fields still empty
    pub missing: Vec<String>,
    /// Validation failures other than missing fields
    pub errors: Vec<String>,
    /// Whether `values` differ from the current values
    pub changed: bool,
}

impl MergeOutcome {
    /// The candidate carried nothing new
    pub fn unchanged(schema: &FormSchema, current: &FormValues) -> Self {
        Self {
            values: current.clone(),
            missing: missing_fields(schema, current),
            errors: Vec::new(),
            changed: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_rejected(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Required fields whose value is empty, in schema order
pub fn missing_fields(schema: &FormSchema, values: &FormValues) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|f| f.required && !values.is_filled(&f.name))
        .map(|f| f.name.clone())
        .collect()
}

/// Drop unknown keys and null-like values from a candidate
pub fn clean_candidate(schema: &FormSchema, candidate: &Map<String, Value>) -> Map<String, Value> {
    candidate
        .iter()
        .filter(|(key, value)| schema.has_field(key) && !is_empty_value(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Overlay `candidate` on `current` and validate the result
pub fn merge(schema: &FormSchema, current: &FormValues, candidate: &Map<String, Value>) -> MergeOutcome {
    let cleaned = clean_candidate(schema, candidate);

    let mut merged = current.clone();
    for (key, value) in cleaned {
        merged.set(key, value);
    }

    if merged == *current {
        tracing::debug!(form = schema.key(), "Candidate carries no new information");
        return MergeOutcome::unchanged(schema, current);
    }

    let mut validated = merged.clone();
    let mut errors = Vec::new();

    for field in schema.fields() {
        let Some(value) = merged.get(&field.name) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }
        match field.check(value) {
            Ok(normalised) => validated.set(field.name.clone(), normalised),
            Err(message) => errors.push(message),
        }
    }

    if !errors.is_empty() {
        tracing::debug!(form = schema.key(), errors = ?errors, "Candidate rejected");
        return MergeOutcome {
            values: current.clone(),
            missing: missing_fields(schema, current),
            errors,
            changed: false,
        };
    }

    let changed = validated != *current;
    let missing = missing_fields(schema, &validated);

    tracing::debug!(
        form = schema.key(),
        changed,
        missing = ?missing,
        "Candidate merged"
    );

    MergeOutcome {
        values: validated,
        missing,
        errors,
        changed,
    }
}
