//! Form instance: one in-progress attempt to fill a schema

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::merge::{missing_fields, MergeOutcome};
use crate::schema::FormSchema;
use crate::values::FormValues;

/// Dialog state of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    /// Created, first turn not yet processed
    Started,
    AskInformation,
    AskSummary,
    ExecuteAction,
    Stopped,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormState::Started => "started",
            FormState::AskInformation => "ask_information",
            FormState::AskSummary => "ask_summary",
            FormState::ExecuteAction => "execute_action",
            FormState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Live state of one form
#[derive(Debug, Clone)]
pub struct FormInstance {
    id: Uuid,
    schema: Arc<FormSchema>,
    values: FormValues,
    state: FormState,
    missing: Vec<String>,
    errors: Vec<String>,
    is_valid: bool,
    updated_this_turn: bool,
    language: Option<String>,
    turns: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FormInstance {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let values = FormValues::empty(schema.field_names());
        let missing = missing_fields(&schema, &values);
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            schema,
            values,
            state: FormState::Started,
            missing,
            errors: Vec::new(),
            is_valid: true,
            updated_this_turn: false,
            language: None,
            turns: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &str {
        self.schema.key()
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn missing_fields(&self) -> &[String] {
        &self.missing
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn updated_this_turn(&self) -> bool {
        self.updated_this_turn
    }

    /// Every required field is filled
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            id: self.id,
            key: self.key().to_string(),
            state: self.state,
            values: self.values.clone(),
            missing: self.missing.clone(),
            errors: self.errors.clone(),
            is_valid: self.is_valid,
            language: self.language.clone(),
            turns: self.turns,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn begin_turn(&mut self) {
        self.turns += 1;
        self.updated_this_turn = false;
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_language(&mut self, language: String) {
        self.language = Some(language);
    }

    pub(crate) fn set_state(&mut self, state: FormState) {
        if self.state != state {
            tracing::info!(
                form = self.key(),
                from = %self.state,
                to = %state,
                missing = ?self.missing,
                "Form state changed"
            );
            self.state = state;
        }
    }

    /// Apply a merge result
    ///
    /// An unchanged, error-free merge leaves the instance untouched. A
    /// rejected merge keeps the values and records the errors.
    pub(crate) fn apply_merge(&mut self, outcome: MergeOutcome) {
        if outcome.is_rejected() {
            self.errors = outcome.errors;
            self.missing = outcome.missing;
            self.is_valid = false;
            self.updated_this_turn = false;
            return;
        }

        if !outcome.changed {
            self.updated_this_turn = false;
            return;
        }

        self.values = outcome.values;
        self.missing = outcome.missing;
        self.errors.clear();
        self.is_valid = true;
        self.updated_this_turn = true;
    }

    /// Drop errors left over from an earlier rejected update
    pub(crate) fn clear_errors(&mut self) {
        self.errors.clear();
        self.is_valid = true;
    }
}

/// Serialisable view of a form for hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub id: Uuid,
    pub key: String,
    pub state: FormState,
    pub values: FormValues,
    pub missing: Vec<String>,
    pub errors: Vec<String>,
    pub is_valid: bool,
    pub language: Option<String>,
    pub turns: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
