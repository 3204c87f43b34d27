//! Engine facade
//!
//! Wires the schema registry, the dialog state machine and the session pool
//! into a single entry point for hosts.
//!
//! ## Example
//! ```ignore
//! let settings = load_settings(None)?;
//! let engine = FormEngine::from_settings(&settings)?;
//! engine.load_schema("config/schemas/pizza_order.yaml")?;
//!
//! let mut session = SessionContext::new();
//! let reply = engine.start(&mut session, "pizza_order", &Turn::new("I want a pizza")).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use convoform_config::{ConfirmationStrategy, FormSettings, SchemaConfig, Settings};
use convoform_core::{Embedder, LanguageModel};
use convoform_llm::{create_embedder, create_language_model};

use crate::confirm::{EmbeddingSimilarity, ExitIntentDetector, SimilarityConfirmation};
use crate::instance::FormSnapshot;
use crate::machine::{DialogStateMachine, Turn, TurnOutcome};
use crate::pool::SessionPool;
use crate::registry::{FormRegistry, SessionContext};
use crate::schema::FormSchema;
use crate::FormError;

/// Slot-filling engine for any number of sessions
pub struct FormEngine {
    registry: FormRegistry,
    machine: DialogStateMachine,
    sessions: SessionPool,
}

impl FormEngine {
    /// Prompt-based confirmation only; similarity settings are ignored
    pub fn new(llm: Arc<dyn LanguageModel>, settings: FormSettings) -> Self {
        Self::from_machine(DialogStateMachine::new(llm, settings))
    }

    /// Use the embedder for similarity confirmation and exit intent as configured
    pub fn with_embedder(llm: Arc<dyn LanguageModel>, embedder: Arc<dyn Embedder>, settings: FormSettings) -> Self {
        let similarity = Arc::new(EmbeddingSimilarity::new(embedder));
        let strategy = settings.confirmation_strategy;
        let exit_enabled = settings.exit_intent_enabled;
        let threshold = settings.exit_intent_threshold;

        let mut machine = DialogStateMachine::new(llm, settings);
        if strategy == ConfirmationStrategy::Similarity {
            machine = machine.with_confirmation(Arc::new(SimilarityConfirmation::new(similarity.clone())));
        }
        if exit_enabled {
            machine = machine.with_exit_intent(ExitIntentDetector::new(similarity, threshold));
        }

        tracing::info!(
            confirmation = ?strategy,
            exit_intent = exit_enabled,
            "Form engine using embedder"
        );
        Self::from_machine(machine)
    }

    /// Build backends from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, FormError> {
        settings.validate()?;
        let llm = create_language_model(&settings.llm)?;

        if settings.needs_embedder() {
            let embedder = create_embedder(&settings.embedding);
            Ok(Self::with_embedder(llm, embedder, settings.form.clone()))
        } else {
            Ok(Self::new(llm, settings.form.clone()))
        }
    }

    /// Use a custom-built state machine
    pub fn from_machine(machine: DialogStateMachine) -> Self {
        Self {
            registry: FormRegistry::new(),
            machine,
            sessions: SessionPool::new(),
        }
    }

    pub fn registry(&self) -> &FormRegistry {
        &self.registry
    }

    pub fn machine(&self) -> &DialogStateMachine {
        &self.machine
    }

    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    pub fn register_schema(&self, schema: FormSchema) -> Arc<FormSchema> {
        self.registry.register(schema)
    }

    /// Load a YAML schema definition and register it with the JSON action
    pub fn load_schema(&self, path: impl AsRef<Path>) -> Result<Arc<FormSchema>, FormError> {
        let config = SchemaConfig::load(path)?;
        Ok(self.register_schema(FormSchema::from_config(&config)?))
    }

    /// Start the form for `key` and process the utterance that triggered it
    pub async fn start(&self, session: &mut SessionContext, key: &str, turn: &Turn) -> Result<TurnOutcome, FormError> {
        self.registry.start(session, key)?;
        Ok(self.machine.handle_turn(session, turn).await)
    }

    /// Cancel the form without running its action
    pub fn stop(&self, session: &mut SessionContext, key: &str) -> bool {
        self.registry.stop(session, key)
    }

    /// Route an utterance to the active form, if any
    pub async fn handle_turn(&self, session: &mut SessionContext, turn: &Turn) -> TurnOutcome {
        self.machine.handle_turn(session, turn).await
    }

    pub fn snapshot(&self, session: &SessionContext) -> Option<FormSnapshot> {
        self.registry.get_active(session).map(|form| form.snapshot())
    }

    /// [`FormEngine::start`] on a pooled session
    pub async fn start_in(&self, session_id: &str, key: &str, turn: &Turn) -> Result<TurnOutcome, FormError> {
        let session = self.sessions.get_or_create(session_id);
        let mut context = session.lock().await;
        self.start(&mut context, key, turn).await
    }

    /// [`FormEngine::handle_turn`] on a pooled session
    ///
    /// Unknown ids get [`TurnOutcome::NoActiveForm`]; only
    /// [`FormEngine::start_in`] opens sessions.
    pub async fn handle_turn_in(&self, session_id: &str, turn: &Turn) -> TurnOutcome {
        let Some(session) = self.sessions.get(session_id) else {
            return TurnOutcome::NoActiveForm;
        };
        let mut context = session.lock().await;
        self.handle_turn(&mut context, turn).await
    }
}
