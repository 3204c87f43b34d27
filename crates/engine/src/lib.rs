//! Conversational slot-filling engine
//!
//! Fills a [`FormSchema`] from free-text user turns:
//! - [`Extractor`]: utterance + current values -> candidate update (completion oracle)
//! - [`merge`]: monotonic overlay, coercion and validation of the candidate
//! - [`ConfirmationOracle`]: yes/no on the summary, prompt or similarity based
//! - [`DialogStateMachine`]: per-turn orchestration and replies
//! - [`FormRegistry`] / [`SessionContext`]: one active form per session
//! - [`ActionExecutor`]: runs the schema action once and tears the form down
//!
//! [`FormEngine`] wires these together for hosts.

pub mod action;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod instance;
pub mod language;
pub mod machine;
pub mod merge;
pub mod oracle;
pub mod pool;
pub mod prompts;
pub mod registry;
pub mod schema;
pub mod values;

pub use action::{ActionExecutor, FormAction, JsonAction};
pub use confirm::{
    default_confirm_examples, default_exit_examples, parse_yes_no, ConfirmationOracle, EmbeddingSimilarity,
    ExitIntentDetector, LabeledExample, Nearest, PromptConfirmation, SimilarityConfirmation, SimilarityOracle,
    CONFIRM_LABEL, DENY_LABEL, EXIT_LABEL,
};
pub use engine::FormEngine;
pub use error::FormError;
pub use extractor::Extractor;
pub use instance::{FormInstance, FormSnapshot, FormState};
pub use language::LanguageDetector;
pub use machine::{DialogStateMachine, Turn, TurnMetadata, TurnOutcome};
pub use merge::{merge, missing_fields, MergeOutcome};
pub use pool::{PooledSession, SessionPool};
pub use prompts::PromptContext;
pub use registry::{FormRegistry, SessionContext};
pub use schema::{CustomValidator, FieldExample, FieldSpec, FieldType, FormSchema, PromptHook, SchemaHooks, Validator};
pub use values::{is_empty_value, FormValues};
