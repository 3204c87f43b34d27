//! Form schema: fields, validators and optional prompt hooks
//!
//! A [`FormSchema`] is immutable once built and shared between form
//! instances through an `Arc`. Optional behaviour is exposed as explicit
//! callback slots in [`SchemaHooks`]; every unset slot falls back to the
//! built-in prompt in [`crate::prompts`].

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use convoform_config::{FieldConfig, FieldTypeConfig, SchemaConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::action::{FormAction, JsonAction};
use crate::prompts::PromptContext;
use crate::FormError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
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

impl From<FieldTypeConfig> for FieldType {
    fn from(config: FieldTypeConfig) -> Self {
        match config {
            FieldTypeConfig::Text => FieldType::Text,
            FieldTypeConfig::Number => FieldType::Number,
            FieldTypeConfig::Integer => FieldType::Integer,
            FieldTypeConfig::Boolean => FieldType::Boolean,
            FieldTypeConfig::Email => FieldType::Email,
            FieldTypeConfig::Phone => FieldType::Phone,
            FieldTypeConfig::Date => FieldType::Date,
            FieldTypeConfig::Enum => FieldType::Enum,
        }
    }
}

/// Custom validation closure; `Err` carries the user-facing reason
pub type CustomValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Per-field rule applied after type coercion
#[derive(Clone)]
pub enum Validator {
    /// Case-insensitive match against a fixed domain; normalises the spelling
    OneOf(Vec<String>),
    Pattern(Regex),
    Range { min: Option<f64>, max: Option<f64> },
    Custom(CustomValidator),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Validator::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Validator::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Validator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Validator {
    fn apply(&self, value: Value) -> Result<Value, String> {
        match self {
            Validator::OneOf(allowed) => {
                let given = value_text(&value);
                allowed
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(given.trim()))
                    .map(|canonical| Value::String(canonical.clone()))
                    .ok_or_else(|| format!("'{}' is not one of {}", given, allowed.join(", ")))
            }
            Validator::Pattern(re) => {
                let text = value_text(&value);
                if re.is_match(&text) {
                    Ok(value)
                } else {
                    Err(format!("'{}' has an invalid format", text))
                }
            }
            Validator::Range { min, max } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("'{}' is not a number", value_text(&value)))?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("{} is less than the minimum {}", n, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("{} is greater than the maximum {}", n, max));
                    }
                }
                Ok(value)
            }
            Validator::Custom(check) => check(&value).map(|_| value),
        }
    }
}

/// Example utterance and the value it should yield for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExample {
    pub utterance: String,
    pub value: Value,
}

/// A single named field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub required: bool,
    pub validators: Vec<Validator>,
    pub examples: Vec<FieldExample>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
            required: true,
            validators: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text, description)
    }

    /// Enumerated field with its allowed values
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        description: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(name, FieldType::Enum, description).one_of(values)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn one_of<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.validators
            .push(Validator::OneOf(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.validators.push(Validator::Pattern(pattern));
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.validators.push(Validator::Range { min, max });
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Validator::Custom(Arc::new(check)));
        self
    }

    pub fn example(mut self, utterance: impl Into<String>, value: Value) -> Self {
        self.examples.push(FieldExample {
            utterance: utterance.into(),
            value,
        });
        self
    }

    /// Allowed values when the field has an enumerated domain
    pub fn allowed_values(&self) -> Option<&[String]> {
        self.validators.iter().find_map(|v| match v {
            Validator::OneOf(values) => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Coerce a non-empty value to the field type and run every validator
    ///
    /// Returns the normalised value, or a message prefixed with the field name.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        let coerced = coerce(self.field_type, value)
            .map_err(|reason| format!("{}: {}", self.name, reason))?;

        self.validators
            .iter()
            .try_fold(coerced, |v, validator| validator.apply(v))
            .map_err(|reason| format!("{}: {}", self.name, reason))
    }

    fn from_config(config: &FieldConfig) -> Result<Self, FormError> {
        let mut field = FieldSpec::new(
            config.name.clone(),
            config.field_type.into(),
            config.description.clone(),
        );
        field.required = config.required;

        if !config.values.is_empty() {
            field = field.one_of(config.values.iter().cloned());
        }
        if let Some(pattern) = &config.pattern {
            let re = Regex::new(pattern)
                .map_err(|e| FormError::InvalidSchema(format!("{}: {}", config.name, e)))?;
            field = field.pattern(re);
        }
        if config.min.is_some() || config.max.is_some() {
            field = field.range(config.min, config.max);
        }
        for example in &config.examples {
            field = field.example(example.utterance.clone(), example.value.clone());
        }

        Ok(field)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whole floats inside the `i64` range; `as` would saturate anything beyond it
fn whole_number(f: f64) -> Option<i64> {
    // 2^63 itself is not representable, hence the half-open upper bound
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn coerce(field_type: FieldType, value: &Value) -> Result<Value, String> {
    match field_type {
        FieldType::Text | FieldType::Enum => Ok(match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => Value::String(other.to_string()),
        }),
        FieldType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a number", s)),
            other => Err(format!("'{}' is not a number", other)),
        },
        FieldType::Integer => {
            let n = match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(whole_number)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            n.map(Value::from)
                .ok_or_else(|| format!("'{}' is not a whole number", value_text(value)))
        }
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "1" => Ok(Value::Bool(true)),
                "no" | "n" | "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a yes/no answer", s)),
            },
            other => Err(format!("'{}' is not a yes/no answer", other)),
        },
        FieldType::Email => {
            let text = value_text(value).trim().to_string();
            if EMAIL_RE.is_match(&text) {
                Ok(Value::String(text))
            } else {
                Err(format!("'{}' is not a valid e-mail address", text))
            }
        }
        FieldType::Phone => {
            let text = value_text(value).trim().to_string();
            let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
            let shape_ok = text
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || " -().".contains(c) || (i == 0 && c == '+'));
            if shape_ok && (6..=15).contains(&digits) {
                Ok(Value::String(text))
            } else {
                Err(format!("'{}' is not a valid phone number", text))
            }
        }
        FieldType::Date => {
            let text = value_text(value);
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| format!("'{}' is not a date in YYYY-MM-DD format", text))
        }
    }
}

/// Builds a prompt from the current dialog context
pub type PromptHook = Arc<dyn Fn(&PromptContext<'_>) -> String + Send + Sync>;

/// Optional per-schema prompt overrides
#[derive(Clone, Default)]
pub struct SchemaHooks {
    pub ask_prompt: Option<PromptHook>,
    pub summary_prompt: Option<PromptHook>,
    pub change_prompt: Option<PromptHook>,
    pub confirm_prompt: Option<PromptHook>,
    pub error_prompt: Option<PromptHook>,
}

impl fmt::Debug for SchemaHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHooks")
            .field("ask_prompt", &self.ask_prompt.is_some())
            .field("summary_prompt", &self.summary_prompt.is_some())
            .field("change_prompt", &self.change_prompt.is_some())
            .field("confirm_prompt", &self.confirm_prompt.is_some())
            .field("error_prompt", &self.error_prompt.is_some())
            .finish()
    }
}

/// Static description of a form
#[derive(Clone)]
pub struct FormSchema {
    key: String,
    description: String,
    fields: Vec<FieldSpec>,
    ask_confirm: Option<bool>,
    hooks: SchemaHooks,
    action: Arc<dyn FormAction>,
}

impl fmt::Debug for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSchema")
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("ask_confirm", &self.ask_confirm)
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl FormSchema {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            fields: Vec::new(),
            ask_confirm: None,
            hooks: SchemaHooks::default(),
            action: Arc::new(JsonAction),
        }
    }

    /// Build from a YAML-loaded definition; the action defaults to a JSON dump
    pub fn from_config(config: &SchemaConfig) -> Result<Self, FormError> {
        config.validate()?;

        let mut schema = FormSchema::new(config.key.clone(), config.description.clone());
        schema.ask_confirm = config.ask_confirm;
        for field in &config.fields {
            schema.fields.push(FieldSpec::from_config(field)?);
        }
        Ok(schema)
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Override the engine-wide confirmation setting for this form
    pub fn ask_confirm(mut self, ask: bool) -> Self {
        self.ask_confirm = Some(ask);
        self
    }

    pub fn action<A: FormAction + 'static>(mut self, action: A) -> Self {
        self.action = Arc::new(action);
        self
    }

    pub fn with_ask_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.hooks.ask_prompt = Some(Arc::new(hook));
        self
    }

    pub fn with_summary_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.hooks.summary_prompt = Some(Arc::new(hook));
        self
    }

    pub fn with_change_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.hooks.change_prompt = Some(Arc::new(hook));
        self
    }

    pub fn with_confirm_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.hooks.confirm_prompt = Some(Arc::new(hook));
        self
    }

    pub fn with_error_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.hooks.error_prompt = Some(Arc::new(hook));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn confirm_override(&self) -> Option<bool> {
        self.ask_confirm
    }

    pub fn hooks(&self) -> &SchemaHooks {
        &self.hooks
    }

    pub fn form_action(&self) -> &Arc<dyn FormAction> {
        &self.action
    }

    /// Whether any field carries extraction examples
    pub fn has_examples(&self) -> bool {
        self.fields.iter().any(|f| !f.examples.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_canonicalises_case() {
        let field = FieldSpec::enumeration("pizza", "the pizza", ["Margherita", "Diavola"]);
        assert_eq!(field.check(&json!("margherita")).unwrap(), json!("Margherita"));

        let err = field.check(&json!("test")).unwrap_err();
        assert!(err.starts_with("pizza: 'test' is not one of"));
    }

    #[test]
    fn test_number_coercion() {
        let field = FieldSpec::new("amount", FieldType::Number, "amount");
        assert_eq!(field.check(&json!("42")).unwrap(), json!(42.0));
        assert_eq!(field.check(&json!(3.5)).unwrap(), json!(3.5));
        assert!(field.check(&json!("lots")).is_err());
    }

    #[test]
    fn test_integer_coercion() {
        let field = FieldSpec::new("count", FieldType::Integer, "count");
        assert_eq!(field.check(&json!("7")).unwrap(), json!(7));
        assert_eq!(field.check(&json!(2.0)).unwrap(), json!(2));
        assert!(field.check(&json!(2.5)).is_err());
    }

    #[test]
    fn test_integer_out_of_range_is_rejected() {
        let field = FieldSpec::new("count", FieldType::Integer, "count");
        assert!(field.check(&json!(1e30)).is_err());
        assert!(field.check(&json!(-1e30)).is_err());
        assert!(field.check(&json!("99999999999999999999")).is_err());
        assert_eq!(field.check(&json!(-4.0e3)).unwrap(), json!(-4000));
    }

    #[test]
    fn test_boolean_coercion() {
        let field = FieldSpec::new("vegan", FieldType::Boolean, "vegan");
        assert_eq!(field.check(&json!("Yes")).unwrap(), json!(true));
        assert_eq!(field.check(&json!("no")).unwrap(), json!(false));
        assert_eq!(field.check(&json!(1)).unwrap(), json!(true));
        assert!(field.check(&json!("maybe")).is_err());
    }

    #[test]
    fn test_email_and_phone() {
        let email = FieldSpec::new("email", FieldType::Email, "email");
        assert_eq!(email.check(&json!(" jane@x.com ")).unwrap(), json!("jane@x.com"));
        assert!(email.check(&json!("jane at x")).is_err());

        let phone = FieldSpec::new("phone", FieldType::Phone, "phone");
        assert!(phone.check(&json!("+39 333-123 4567")).is_ok());
        assert_eq!(phone.check(&json!(123123123)).unwrap(), json!("123123123"));
        assert!(phone.check(&json!("12")).is_err());
        assert!(phone.check(&json!("call me")).is_err());
    }

    #[test]
    fn test_date() {
        let field = FieldSpec::new("when", FieldType::Date, "date");
        assert_eq!(field.check(&json!("2024-02-29")).unwrap(), json!("2024-02-29"));
        assert!(field.check(&json!("2023-02-29")).is_err());
        assert!(field.check(&json!("tomorrow")).is_err());
    }

    #[test]
    fn test_range_and_custom() {
        let field = FieldSpec::new("qty", FieldType::Integer, "quantity")
            .range(Some(1.0), Some(10.0))
            .validator(|v| {
                if v.as_i64() == Some(7) {
                    Err("seven is sold out".to_string())
                } else {
                    Ok(())
                }
            });

        assert!(field.check(&json!(3)).is_ok());
        assert!(field.check(&json!(0)).unwrap_err().contains("minimum"));
        assert!(field.check(&json!(11)).unwrap_err().contains("maximum"));
        assert_eq!(field.check(&json!(7)).unwrap_err(), "qty: seven is sold out");
    }

    #[test]
    fn test_pattern() {
        let field = FieldSpec::text("code", "code").pattern(Regex::new(r"^[A-Z]{3}$").unwrap());
        assert!(field.check(&json!("ABC")).is_ok());
        assert!(field.check(&json!("abcd")).is_err());
    }

    #[test]
    fn test_schema_from_config() {
        let config = SchemaConfig::from_yaml(
            r#"
key: signup
ask_confirm: false
fields:
  - name: name
    description: the user's name
    examples:
      - utterance: "I'm Jane"
        value: Jane
  - name: plan
    type: enum
    values: [Free, Pro]
  - name: seats
    type: integer
    min: 1
    required: false
"#,
        )
        .unwrap();

        let schema = FormSchema::from_config(&config).unwrap();
        assert_eq!(schema.key(), "signup");
        assert_eq!(schema.confirm_override(), Some(false));
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["name", "plan", "seats"]);
        assert!(schema.has_examples());

        let plan = schema.get_field("plan").unwrap();
        assert_eq!(plan.allowed_values().unwrap(), ["Free", "Pro"]);
        assert!(!schema.get_field("seats").unwrap().required);
        assert!(schema.get_field("seats").unwrap().check(&json!(0)).is_err());
    }

    #[test]
    fn test_builder_hooks() {
        let schema = FormSchema::new("k", "d")
            .field(FieldSpec::text("a", "a"))
            .with_ask_prompt(|ctx| format!("custom {}", ctx.schema.key()));

        assert!(schema.hooks().ask_prompt.is_some());
        assert!(schema.hooks().summary_prompt.is_none());
        assert!(schema.has_field("a"));
        assert!(!schema.has_examples());
    }
}
