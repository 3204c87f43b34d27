//! Engine settings, layered from YAML files and `CONVOFORM__*` variables

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{embedding, form, llm};
use crate::ConfigError;

/// Deployment stage; production turns some warnings into errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Everything the engine and its backends read at startup
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Completion oracle configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Embedding configuration (similarity strategies only)
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Dialog behaviour
    #[serde(default)]
    pub form: FormSettings,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
}

/// Completion oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Extraction and yes/no checks want deterministic output
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Ollama keep_alive ("5m", "1h", "-1", "0")
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_llm_model() -> String {
    llm::DEFAULT_MODEL.to_string()
}
fn default_llm_endpoint() -> String {
    llm::DEFAULT_ENDPOINT.to_string()
}
fn default_max_tokens() -> usize {
    512
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_p() -> f32 {
    0.9
}
fn default_request_timeout_ms() -> u64 {
    llm::DEFAULT_REQUEST_TIMEOUT_MS
}
fn default_max_retries() -> u32 {
    llm::DEFAULT_MAX_RETRIES
}
fn default_initial_backoff_ms() -> u64 {
    llm::DEFAULT_INITIAL_BACKOFF_MS
}
fn default_keep_alive() -> String {
    "5m".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            keep_alive: default_keep_alive(),
        }
    }
}

/// Embedding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dim")]
    pub dimension: usize,
}

fn default_embedding_model() -> String {
    embedding::DEFAULT_MODEL.to_string()
}
fn default_embedding_dim() -> usize {
    embedding::DEFAULT_DIMENSION
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dim(),
        }
    }
}

/// How a yes/no answer to the summary is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStrategy {
    /// Ask the completion oracle a strict YES/NO question
    #[default]
    Prompt,
    /// Nearest labelled example by embedding similarity
    Similarity,
}

/// Dialog behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    /// Show a summary and wait for confirmation before running the action
    #[serde(default = "default_true")]
    pub ask_confirm: bool,

    /// Bounded wait around each completion-oracle call
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,

    /// Fixed reply language; overrides detection when set
    #[serde(default)]
    pub language: Option<String>,

    /// Ask the oracle for the user's language on the first turn of a form
    #[serde(default)]
    pub detect_language: bool,

    #[serde(default)]
    pub confirmation_strategy: ConfirmationStrategy,

    /// Stop the form when the user asks to leave it
    #[serde(default)]
    pub exit_intent_enabled: bool,

    #[serde(default = "default_exit_threshold")]
    pub exit_intent_threshold: f32,

    /// Yield the turn when the host already fired unrelated actions and the form did not change
    #[serde(default = "default_true")]
    pub skip_when_other_actions: bool,
}

fn default_true() -> bool {
    true
}
fn default_oracle_timeout_ms() -> u64 {
    form::DEFAULT_ORACLE_TIMEOUT_MS
}
fn default_exit_threshold() -> f32 {
    form::DEFAULT_EXIT_INTENT_THRESHOLD
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            ask_confirm: true,
            oracle_timeout_ms: default_oracle_timeout_ms(),
            language: None,
            detect_language: false,
            confirmation_strategy: ConfirmationStrategy::default(),
            exit_intent_enabled: false,
            exit_intent_threshold: default_exit_threshold(),
            skip_when_other_actions: true,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Level for the engine's own targets; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// One JSON object per line instead of human-readable text
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Check ranges and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_llm()?;
        self.validate_form()?;
        self.validate_observability()?;
        Ok(())
    }

    /// Debug logs carry user utterances and prompts
    fn validate_observability(&self) -> Result<(), ConfigError> {
        let level = self.observability.log_level.trim().to_ascii_lowercase();
        if !matches!(level.as_str(), "debug" | "trace") {
            return Ok(());
        }
        if self.environment.is_production() {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_level".to_string(),
                message: format!("'{}' would log user input in production", level),
            });
        }
        tracing::warn!(log_level = %level, "Verbose logging includes user input");
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if !(0.0..=1.0).contains(&llm.top_p) {
            return Err(ConfigError::InvalidValue {
                field: "llm.top_p".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", llm.top_p),
            });
        }

        if llm.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.request_timeout_ms".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    fn validate_form(&self) -> Result<(), ConfigError> {
        let form = &self.form;

        if form.oracle_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "form.oracle_timeout_ms".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&form.exit_intent_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "form.exit_intent_threshold".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    form.exit_intent_threshold
                ),
            });
        }

        if let Some(language) = &form.language {
            if language.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "form.language".to_string(),
                    message: "Must not be blank when set".to_string(),
                });
            }
        }

        if self.needs_embedder() && self.embedding.model.trim().is_empty() {
            return Err(ConfigError::MissingField("embedding.model".to_string()));
        }

        Ok(())
    }

    /// Whether any configured strategy needs an embedder
    pub fn needs_embedder(&self) -> bool {
        self.form.exit_intent_enabled
            || self.form.confirmation_strategy == ConfirmationStrategy::Similarity
    }
}

/// Read `config/default`, then `config/{env}`, then the environment
///
/// Priority: `CONVOFORM__*` env vars > `config/{env}` > `config/default` > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with another config directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let layer = |name: &str| File::with_name(&format!("{}/{}", dir, name)).required(false);

    let mut builder = Config::builder().add_source(layer("default"));
    if let Some(env_name) = env {
        builder = builder.add_source(layer(env_name));
    }

    let settings: Settings = builder
        .add_source(
            Environment::with_prefix("CONVOFORM")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.form.ask_confirm);
        assert_eq!(settings.form.oracle_timeout_ms, 20_000);
        assert_eq!(settings.form.confirmation_strategy, ConfirmationStrategy::Prompt);
        assert!(!settings.needs_embedder());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_threshold_validation() {
        let mut settings = Settings::default();
        settings.form.exit_intent_threshold = 1.5;
        assert!(settings.validate().is_err());

        settings.form.exit_intent_threshold = 0.8;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_timeout_validation() {
        let mut settings = Settings::default();
        settings.form.oracle_timeout_ms = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_temperature_validation() {
        let mut settings = Settings::default();
        settings.llm.temperature = 2.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_logging_rejected_in_production() {
        let mut settings = Settings::default();
        settings.observability.log_level = "debug".to_string();
        assert!(settings.validate().is_ok());

        settings.environment = RuntimeEnvironment::Production;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "observability.log_level"
        ));

        settings.observability.log_level = "info".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_similarity_needs_embedder() {
        let mut settings = Settings::default();
        settings.form.confirmation_strategy = ConfirmationStrategy::Similarity;
        assert!(settings.needs_embedder());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "form:\n  ask_confirm: false\n  language: Italian\nllm:\n  model: llama3\n"
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert!(!settings.form.ask_confirm);
        assert_eq!(settings.form.language.as_deref(), Some("Italian"));
        assert_eq!(settings.llm.model, "llama3");
        // untouched sections keep their defaults
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_env_specific_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "form:\n  oracle_timeout_ms: 1000\n")
            .unwrap();
        std::fs::write(dir.path().join("staging.yaml"), "form:\n  oracle_timeout_ms: 5000\n")
            .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), Some("staging")).unwrap();
        assert_eq!(settings.form.oracle_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "form:\n  exit_intent_threshold: 3.0\n",
        )
        .unwrap();

        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}
