//! Dialog state machine
//!
//! Drives the active form of a session through
//! `AskInformation -> AskSummary -> ExecuteAction` one utterance at a time.
//! Every oracle failure is recovered here, so a turn always resolves to a
//! reply, a completed action or a hand-off back to the host.

use std::sync::Arc;
use std::time::Duration;

use convoform_config::FormSettings;
use convoform_core::LanguageModel;

use crate::action::ActionExecutor;
use crate::confirm::{ConfirmationOracle, ExitIntentDetector, PromptConfirmation};
use crate::extractor::Extractor;
use crate::instance::{FormInstance, FormState};
use crate::language::LanguageDetector;
use crate::merge::merge;
use crate::oracle::complete_within;
use crate::prompts::{self, PromptContext};
use crate::registry::SessionContext;
use crate::schema::{FormSchema, PromptHook};

/// Signals supplied by the host alongside an utterance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnMetadata {
    /// The host already fired unrelated actions for this utterance
    pub other_actions_fired: bool,
}

/// One user utterance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    pub utterance: String,
    pub metadata: TurnMetadata,
}

impl Turn {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            metadata: TurnMetadata::default(),
        }
    }

    pub fn with_other_actions(mut self, fired: bool) -> Self {
        self.metadata.other_actions_fired = fired;
        self
    }
}

impl From<&str> for Turn {
    fn from(utterance: &str) -> Self {
        Turn::new(utterance)
    }
}

/// How a turn was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Text to send back to the user
    Reply(String),
    /// The form was completed and its action ran; the form is gone
    ActionCompleted { key: String, result: String },
    /// The form yields this turn to the host
    NoReply,
    /// The session has no active form
    NoActiveForm,
    /// The user left the form; it was stopped without running the action
    Exited { key: String },
}

impl TurnOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Reply(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, TurnOutcome::Reply(_))
    }
}

/// Internal result of the per-form steps
enum Step {
    Reply(String),
    Skip,
    Execute,
}

#[derive(Debug, Clone, Copy)]
enum ReplyKind {
    AskMissing,
    Summary,
    Change,
    Error,
}

type PromptFn = for<'a, 'b> fn(&'a PromptContext<'b>) -> String;

impl ReplyKind {
    fn hook(self, schema: &FormSchema) -> Option<&PromptHook> {
        let hooks = schema.hooks();
        match self {
            ReplyKind::AskMissing => hooks.ask_prompt.as_ref(),
            ReplyKind::Summary => hooks.summary_prompt.as_ref(),
            ReplyKind::Change => hooks.change_prompt.as_ref(),
            ReplyKind::Error => hooks.error_prompt.as_ref(),
        }
    }

    fn builtin(self) -> PromptFn {
        match self {
            ReplyKind::AskMissing => prompts::ask_missing_prompt,
            ReplyKind::Summary => prompts::summary_prompt,
            ReplyKind::Change => prompts::change_prompt,
            ReplyKind::Error => prompts::error_prompt,
        }
    }

    fn fallback(self) -> PromptFn {
        match self {
            ReplyKind::AskMissing => prompts::fallback_ask,
            ReplyKind::Summary => prompts::fallback_summary,
            ReplyKind::Change => prompts::fallback_change,
            ReplyKind::Error => prompts::fallback_error,
        }
    }
}

/// Per-turn orchestration of extraction, merge, confirmation and replies
pub struct DialogStateMachine {
    llm: Arc<dyn LanguageModel>,
    extractor: Extractor,
    confirmation: Arc<dyn ConfirmationOracle>,
    exit_intent: Option<Arc<ExitIntentDetector>>,
    language: LanguageDetector,
    settings: FormSettings,
    timeout: Duration,
}

impl DialogStateMachine {
    /// Prompt-based confirmation, no exit-intent check
    pub fn new(llm: Arc<dyn LanguageModel>, settings: FormSettings) -> Self {
        let timeout = Duration::from_millis(settings.oracle_timeout_ms);

        Self {
            extractor: Extractor::new(llm.clone(), timeout),
            confirmation: Arc::new(PromptConfirmation::new(llm.clone(), timeout)),
            exit_intent: None,
            language: LanguageDetector::new(llm.clone(), timeout),
            llm,
            settings,
            timeout,
        }
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationOracle>) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_exit_intent(mut self, detector: ExitIntentDetector) -> Self {
        self.exit_intent = Some(Arc::new(detector));
        self
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// Process one utterance for the active form of `session`
    pub async fn handle_turn(&self, session: &mut SessionContext, turn: &Turn) -> TurnOutcome {
        let (key, first_turn) = match session.active() {
            // a rejected turn leaves the state untouched, so count turns instead
            Some(form) => (form.key().to_string(), form.turns() == 0),
            None => return TurnOutcome::NoActiveForm,
        };

        if !first_turn && self.is_exit(&turn.utterance).await {
            if let Some(mut form) = session.remove(&key) {
                form.set_state(FormState::Stopped);
            }
            tracing::info!(form = %key, "User left the form");
            return TurnOutcome::Exited { key };
        }

        let Some(form) = session.active_mut() else {
            return TurnOutcome::NoActiveForm;
        };
        form.begin_turn();
        self.resolve_language(form, &turn.utterance).await;

        match self.advance(form, turn, first_turn).await {
            Step::Reply(text) => TurnOutcome::Reply(text),
            Step::Skip => TurnOutcome::NoReply,
            Step::Execute => match ActionExecutor::execute(session, &key) {
                Some(result) => TurnOutcome::ActionCompleted { key, result },
                None => TurnOutcome::NoActiveForm,
            },
        }
    }

    async fn advance(&self, form: &mut FormInstance, turn: &Turn, first_turn: bool) -> Step {
        let utterance = turn.utterance.as_str();
        let mut declined = false;

        if form.state() == FormState::AskSummary && form.is_valid() {
            let confirmed = self
                .confirmation
                .confirm(&PromptContext::new(form, utterance))
                .await;

            if confirmed {
                form.set_state(FormState::ExecuteAction);
                return Step::Execute;
            }
            form.set_state(FormState::AskInformation);
            declined = true;
        }

        if let Some(candidate) = self.extractor.extract(utterance, form.schema(), form.values()).await {
            let outcome = merge(form.schema(), form.values(), &candidate);
            let rejected = outcome.is_rejected();
            form.apply_merge(outcome);
            if rejected {
                return Step::Reply(self.render(form, utterance, ReplyKind::Error).await);
            }
        }
        form.clear_errors();

        let skip = !form.updated_this_turn()
            && !first_turn
            && !declined
            && form.state() != FormState::AskSummary
            && turn.metadata.other_actions_fired
            && self.settings.skip_when_other_actions;
        if skip {
            tracing::debug!(form = form.key(), state = %form.state(), "Turn handled elsewhere, yielding");
            return Step::Skip;
        }

        if !form.is_complete() {
            form.set_state(FormState::AskInformation);
            return Step::Reply(self.render(form, utterance, ReplyKind::AskMissing).await);
        }

        if declined && !form.updated_this_turn() {
            return Step::Reply(self.render(form, utterance, ReplyKind::Change).await);
        }

        if self.ask_confirm(form.schema()) {
            form.set_state(FormState::AskSummary);
            Step::Reply(self.render(form, utterance, ReplyKind::Summary).await)
        } else {
            form.set_state(FormState::ExecuteAction);
            Step::Execute
        }
    }

    fn ask_confirm(&self, schema: &FormSchema) -> bool {
        schema.confirm_override().unwrap_or(self.settings.ask_confirm)
    }

    async fn is_exit(&self, utterance: &str) -> bool {
        match &self.exit_intent {
            Some(detector) => detector.is_exit(utterance).await,
            None => false,
        }
    }

    async fn resolve_language(&self, form: &mut FormInstance, utterance: &str) {
        if form.language().is_some() {
            return;
        }
        if let Some(language) = &self.settings.language {
            form.set_language(language.clone());
        } else if self.settings.detect_language {
            let language = self.language.detect(utterance).await;
            tracing::debug!(form = form.key(), language = %language, "Detected language");
            form.set_language(language);
        }
    }

    /// Generate a reply through the oracle, falling back to a local template
    async fn render(&self, form: &FormInstance, utterance: &str, kind: ReplyKind) -> String {
        let ctx = PromptContext::new(form, utterance);
        let prompt = match kind.hook(form.schema()) {
            Some(hook) => hook(&ctx),
            None => (kind.builtin())(&ctx),
        };

        match complete_within(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(form = form.key(), kind = ?kind, "Empty reply from oracle, using fallback");
                (kind.fallback())(&ctx)
            }
            Err(e) => {
                tracing::warn!(form = form.key(), kind = ?kind, error = %e, "Reply generation failed, using fallback");
                (kind.fallback())(&ctx)
            }
        }
    }
}
