//! Engine errors
//!
//! Only host-facing misuse ends up here. Oracle failures during a turn are
//! recovered inside the state machine and never surface as `FormError`.

use convoform_config::{ConfigError, SchemaConfigError};
use convoform_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Unknown form schema: {0}")]
    UnknownSchema(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),
}

impl From<SchemaConfigError> for FormError {
    fn from(err: SchemaConfigError) -> Self {
        FormError::InvalidSchema(err.to_string())
    }
}

impl From<FormError> for convoform_core::Error {
    fn from(err: FormError) -> Self {
        convoform_core::Error::Config(err.to_string())
    }
}
