//! Form values and the empty sentinel

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Strings the oracle emits when it has nothing to say about a field
const NULL_LIKE: &[&str] = &["none", "null", "lower-case"];

/// Whether a value counts as "not filled"
///
/// Absent/null, blank strings, null-like literals and empty containers are
/// empty. Numeric zero and `false` are real values.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || NULL_LIKE.iter().any(|n| s.eq_ignore_ascii_case(n))
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Current values of a form, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(Map<String, Value>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every named field present and empty
    pub fn empty<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            fields
                .into_iter()
                .map(|name| (name.to_string(), Value::Null))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of a field, if it holds one
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether the field holds a non-empty value
    pub fn is_filled(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|v| !is_empty_value(v))
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Display form of a single value; empty values render as ""
    pub fn display(&self, field: &str) -> String {
        match self.0.get(field) {
            Some(v) if !is_empty_value(v) => match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            _ => String::new(),
        }
    }
}

impl From<Map<String, Value>> for FormValues {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
