//! Form schema configuration
//!
//! Defines config-driven form schemas. The engine turns a [`SchemaConfig`]
//! into a runtime schema with validators attached.
//!
//! ```yaml
//! key: pizza_order
//! description: a pizza order
//! fields:
//!   - name: pizza_type
//!     type: enum
//!     description: the kind of pizza
//!     values: [Margherita, Diavola]
//!     examples:
//!       - utterance: "I'd like a margherita"
//!         value: Margherita
//!   - name: address
//!     description: the delivery address
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Form schema loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Form identity, unique per session
    pub key: String,
    /// What the form collects, used in prompts
    #[serde(default)]
    pub description: String,
    /// Overrides `form.ask_confirm` from settings when present
    #[serde(default)]
    pub ask_confirm: Option<bool>,
    /// Fields in asking order
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Field semantic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldTypeConfig {
    #[default]
    Text,
    Number,
    Integer,
    Boolean,
    Email,
    Phone,
    Date,
    Enum,
}

/// A single field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldTypeConfig,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Enumerated domain (required for `enum`)
    #[serde(default)]
    pub values: Vec<String>,
    /// Regex the value must match
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Few-shot extraction examples
    #[serde(default)]
    pub examples: Vec<ExampleConfig>,
}

fn default_required() -> bool {
    true
}

/// An example utterance and the value it should produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleConfig {
    pub utterance: String,
    pub value: serde_json::Value,
}

impl SchemaConfig {
    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SchemaConfigError::FileNotFound(path.as_ref().display().to_string(), e.to_string())
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self, SchemaConfigError> {
        let schema: SchemaConfig =
            serde_yaml::from_str(content).map_err(|e| SchemaConfigError::ParseError(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Get a field definition by name
    pub fn get_field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check structural rules that serde cannot express
    pub fn validate(&self) -> Result<(), SchemaConfigError> {
        if self.key.trim().is_empty() {
            return Err(SchemaConfigError::invalid("key", "must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(SchemaConfigError::invalid("fields", "a form needs at least one field"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            let path = format!("fields.{}", field.name);

            if field.name.trim().is_empty() {
                return Err(SchemaConfigError::invalid("fields.name", "must not be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaConfigError::invalid(&path, "duplicate field name"));
            }
            if field.field_type == FieldTypeConfig::Enum && field.values.is_empty() {
                return Err(SchemaConfigError::invalid(&path, "enum field without values"));
            }
            if let Some(pattern) = &field.pattern {
                Regex::new(pattern).map_err(|e| {
                    SchemaConfigError::invalid(&path, &format!("bad pattern: {}", e))
                })?;
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    return Err(SchemaConfigError::invalid(
                        &path,
                        &format!("min {} is greater than max {}", min, max),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Errors when loading a form schema
#[derive(Debug, thiserror::Error)]
pub enum SchemaConfigError {
    #[error("Schema file not found: {0}: {1}")]
    FileNotFound(String, String),

    #[error("Failed to parse schema: {0}")]
    ParseError(String),

    #[error("Invalid schema {field}: {message}")]
    Invalid { field: String, message: String },
}

impl SchemaConfigError {
    fn invalid(field: &str, message: &str) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIZZA: &str = r#"
key: pizza_order
description: a pizza order
ask_confirm: false
fields:
  - name: pizza_type
    type: enum
    description: the kind of pizza
    values: [Margherita, Diavola]
    examples:
      - utterance: "I'd like a margherita"
        value: Margherita
  - name: address
    description: the delivery address
  - name: quantity
    type: integer
    min: 1
    max: 20
    required: false
"#;

    #[test]
    fn test_parse_schema() {
        let schema = SchemaConfig::from_yaml(PIZZA).unwrap();
        assert_eq!(schema.key, "pizza_order");
        assert_eq!(schema.ask_confirm, Some(false));
        assert_eq!(schema.fields.len(), 3);

        let pizza = schema.get_field("pizza_type").unwrap();
        assert_eq!(pizza.field_type, FieldTypeConfig::Enum);
        assert_eq!(pizza.examples[0].value, serde_json::json!("Margherita"));

        let address = schema.get_field("address").unwrap();
        assert_eq!(address.field_type, FieldTypeConfig::Text);
        assert!(address.required);

        let quantity = schema.get_field("quantity").unwrap();
        assert!(!quantity.required);
        assert_eq!(quantity.max, Some(20.0));
    }

    #[test]
    fn test_field_order_preserved() {
        let schema = SchemaConfig::from_yaml(PIZZA).unwrap();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["pizza_type", "address", "quantity"]);
    }

    #[test]
    fn test_enum_without_values_rejected() {
        let yaml = "key: k\nfields:\n  - name: size\n    type: enum\n";
        assert!(matches!(
            SchemaConfig::from_yaml(yaml),
            Err(SchemaConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let yaml = "key: k\nfields:\n  - name: a\n  - name: a\n";
        assert!(SchemaConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let yaml = "key: k\nfields:\n  - name: code\n    pattern: \"[a-\"\n";
        assert!(SchemaConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let yaml = "key: k\nfields:\n  - name: n\n    type: number\n    min: 5\n    max: 1\n";
        assert!(SchemaConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pizza.yaml");
        std::fs::write(&path, PIZZA).unwrap();

        let schema = SchemaConfig::load(&path).unwrap();
        assert_eq!(schema.description, "a pizza order");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SchemaConfig::load("/nonexistent/schema.yaml"),
            Err(SchemaConfigError::FileNotFound(..))
        ));
    }
}
