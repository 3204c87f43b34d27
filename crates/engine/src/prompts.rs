//! Built-in prompts and local fallbacks
//!
//! Each prompt is sent to the completion oracle. When the oracle fails or
//! times out the state machine replies with the matching `fallback_*` text.

use convoform_config::constants::form::DEFAULT_LANGUAGE;

use crate::instance::FormInstance;
use crate::schema::{FieldSpec, FormSchema};
use crate::values::FormValues;

/// Everything a prompt builder may look at
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub schema: &'a FormSchema,
    pub values: &'a FormValues,
    pub missing: &'a [String],
    pub errors: &'a [String],
    pub language: &'a str,
    pub utterance: &'a str,
}

impl<'a> PromptContext<'a> {
    pub fn new(instance: &'a FormInstance, utterance: &'a str) -> Self {
        Self {
            schema: instance.schema(),
            values: instance.values(),
            missing: instance.missing_fields(),
            errors: instance.errors(),
            language: instance.language().unwrap_or(DEFAULT_LANGUAGE),
            utterance,
        }
    }

    /// The one field to ask for next
    pub fn next_missing(&self) -> Option<&'a FieldSpec> {
        self.missing
            .first()
            .and_then(|name| self.schema.get_field(name))
    }
}

/// `- field: value` lines in schema order
pub fn render_values(schema: &FormSchema, values: &FormValues) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("- {}: {}", f.name, values.display(&f.name)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe(field: &FieldSpec) -> String {
    let mut text = if field.description.is_empty() {
        field.name.clone()
    } else {
        format!("{} ({})", field.name, field.description)
    };
    if let Some(values) = field.allowed_values() {
        text.push_str(&format!(", one of: {}", values.join(", ")));
    }
    text
}

pub fn ask_missing_prompt(ctx: &PromptContext<'_>) -> String {
    let item = ctx
        .next_missing()
        .map(describe)
        .unwrap_or_default();

    format!(
        "Imagine you have to fill out {form} and some information is missing.\n\
         Ask the user to provide only the following piece of information, \
         as a single short question.\n\
         Do not list other fields. Keep a friendly and professional tone.\n\
         Use {language} language.\n\n\
         ### missing information: {item}",
        form = form_name(ctx.schema),
        language = ctx.language,
        item = item,
    )
}

pub fn summary_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "You have collected the following information from the user for {form}:\n\
         ### form data:\n{data}\n\n\
         Summarize the information contained in the form data.\n\
         Next, ask the user to confirm whether the information collected is correct.\n\
         Use {language} language.",
        form = form_name(ctx.schema),
        data = render_values(ctx.schema, ctx.values),
        language = ctx.language,
    )
}

pub fn change_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "Your form contains all the necessary information. Show the summary of the data \
         present in the completed form and ask the user if they want to change something.\n\
         ### form data:\n{data}\n\n\
         Use {language} language.",
        data = render_values(ctx.schema, ctx.values),
        language = ctx.language,
    )
}

pub fn confirm_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "Given a sentence that I will now give you,\n\
         just respond with 'YES' or 'NO' depending on whether the sentence is:\n\
         - a refusal either has a negative meaning or is an intention to cancel the form (NO)\n\
         - an acceptance has a positive or neutral meaning (YES).\n\
         If you are unsure, answer 'NO'.\n\n\
         The sentence is as follows:\n\
         User message: {}",
        ctx.utterance
    )
}

pub fn error_prompt(ctx: &PromptContext<'_>) -> String {
    let error = ctx.errors.first().map(String::as_str).unwrap_or_default();
    format!(
        "The user gave a value that was rejected while filling out {form}.\n\
         Explain the problem briefly and ask for a correct value.\n\
         Use {language} language.\n\n\
         ### validation error: {error}",
        form = form_name(ctx.schema),
        language = ctx.language,
        error = error,
    )
}

pub fn language_prompt(utterance: &str) -> String {
    format!(
        "Identify the language of the following message \
         and return only the language of the message, without other text.\n\
         If you can't locate it, return '{default}'.\n\
         Message examples:\n\
         'Ciao, come stai?', returns: 'Italian',\n\
         'How do you go?', returns 'English',\n\
         'Bonjour a tous', returns 'French'\n\n\
         Message: '{utterance}'",
        default = DEFAULT_LANGUAGE,
        utterance = utterance,
    )
}

pub fn fallback_ask(ctx: &PromptContext<'_>) -> String {
    match ctx.next_missing() {
        Some(field) if !field.description.is_empty() => {
            format!("Please provide {}.", field.description.to_lowercase())
        }
        Some(field) => format!("Please provide your {}.", field.name.replace('_', " ")),
        None => "Is there anything else you would like to add?".to_string(),
    }
}

pub fn fallback_summary(ctx: &PromptContext<'_>) -> String {
    format!(
        "Here is what I have:\n{}\nIs this correct?",
        render_values(ctx.schema, ctx.values)
    )
}

pub fn fallback_change(ctx: &PromptContext<'_>) -> String {
    format!(
        "Here is what I have:\n{}\nWhat would you like to change?",
        render_values(ctx.schema, ctx.values)
    )
}

pub fn fallback_error(ctx: &PromptContext<'_>) -> String {
    match ctx.errors.first() {
        Some(error) => format!("{}. Could you try again?", error),
        None => "Something did not look right. Could you try again?".to_string(),
    }
}

fn form_name(schema: &FormSchema) -> String {
    if schema.description().is_empty() {
        format!("a form ({})", schema.key())
    } else {
        schema.description().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;
    use std::sync::Arc;

    fn instance() -> FormInstance {
        FormInstance::new(Arc::new(
            FormSchema::new("signup", "a registration form")
                .field(FieldSpec::text("name", "Your full name"))
                .field(FieldSpec::new("email", FieldType::Email, "your e-mail address"))
                .field(FieldSpec::enumeration("plan", "", ["Free", "Pro"])),
        ))
    }

    #[test]
    fn test_ask_prompt_names_only_first_missing() {
        let form = instance();
        let ctx = PromptContext::new(&form, "hi");
        let prompt = ask_missing_prompt(&ctx);

        assert!(prompt.contains("### missing information: name (Your full name)"));
        assert!(!prompt.contains("email"));
        assert!(prompt.contains("Use English language."));
    }

    #[test]
    fn test_enum_choices_in_ask_prompt() {
        let form = instance();
        let missing = vec!["plan".to_string()];
        let ctx = PromptContext {
            missing: &missing,
            ..PromptContext::new(&form, "hi")
        };
        assert!(ask_missing_prompt(&ctx).contains("one of: Free, Pro"));
    }

    #[test]
    fn test_render_values() {
        let form = instance();
        let mut values = form.values().clone();
        values.set("name", json!("Jane"));
        assert_eq!(
            render_values(form.schema(), &values),
            "- name: Jane\n- email: \n- plan: "
        );
    }

    #[test]
    fn test_confirm_prompt_carries_utterance() {
        let form = instance();
        let prompt = confirm_prompt(&PromptContext::new(&form, "sure thing"));
        assert!(prompt.ends_with("User message: sure thing"));
        assert!(prompt.contains("If you are unsure, answer 'NO'."));
    }

    #[test]
    fn test_fallbacks() {
        let form = instance();
        let ctx = PromptContext::new(&form, "hi");
        assert_eq!(fallback_ask(&ctx), "Please provide your full name.");
        assert!(fallback_summary(&ctx).ends_with("Is this correct?"));
        assert!(fallback_change(&ctx).ends_with("What would you like to change?"));

        let errors = vec!["email: 'x' is not a valid e-mail address".to_string()];
        let ctx = PromptContext {
            errors: &errors,
            ..ctx
        };
        assert!(fallback_error(&ctx).starts_with("email: 'x'"));
        assert!(error_prompt(&ctx).contains("### validation error: email"));
    }

    #[test]
    fn test_language_prompt() {
        assert!(language_prompt("Ciao").ends_with("Message: 'Ciao'"));
    }
}
