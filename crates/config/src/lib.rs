//! Configuration management for the conversational form engine
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`CONVOFORM__` prefix, `__` as section separator)
//!
//! Form schemas are authored separately as YAML and loaded through
//! [`SchemaConfig`].

pub mod constants;
pub mod schema;
pub mod settings;
pub mod telemetry;

pub use schema::{ExampleConfig, FieldConfig, FieldTypeConfig, SchemaConfig, SchemaConfigError};
pub use settings::{
    load_settings, load_settings_from, ConfirmationStrategy, EmbeddingSettings, FormSettings,
    LlmProvider, LlmSettings, ObservabilityConfig, RuntimeEnvironment, Settings,
};
pub use telemetry::init_tracing;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

impl From<SchemaConfigError> for ConfigError {
    fn from(err: SchemaConfigError) -> Self {
        match err {
            SchemaConfigError::FileNotFound(path, _) => ConfigError::FileNotFound(path),
            SchemaConfigError::Invalid { field, message } => {
                ConfigError::InvalidValue { field, message }
            }
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
