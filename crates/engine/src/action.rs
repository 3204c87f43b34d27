//! Completion actions
//!
//! A schema binds its action when it is defined. The executor tears the form
//! down before invoking the action, so each completed form runs it once.

use crate::registry::SessionContext;
use crate::values::FormValues;

/// Callback run with the final values of a completed form
pub trait FormAction: Send + Sync {
    fn execute(&self, values: &FormValues) -> String;
}

impl<F> FormAction for F
where
    F: Fn(&FormValues) -> String + Send + Sync,
{
    fn execute(&self, values: &FormValues) -> String {
        self(values)
    }
}

/// Default action: the collected values as pretty JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAction;

impl FormAction for JsonAction {
    fn execute(&self, values: &FormValues) -> String {
        serde_json::to_string_pretty(values.as_map()).unwrap_or_else(|_| values.to_json().to_string())
    }
}

/// Runs the schema action for a completed form
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    /// Remove the form from the session, then run its action
    ///
    /// Returns `None` when no form is stored under `key`.
    pub fn execute(session: &mut SessionContext, key: &str) -> Option<String> {
        let instance = session.remove(key)?;
        let action = instance.schema().form_action().clone();

        tracing::info!(form = key, id = %instance.id(), "Executing form action");
        Some(action.execute(instance.values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_action() {
        let action = |values: &FormValues| format!("hello {}", values.display("name"));
        let mut values = FormValues::new();
        values.set("name", json!("Jane"));
        assert_eq!(action.execute(&values), "hello Jane");
    }

    #[test]
    fn test_json_action() {
        let mut values = FormValues::new();
        values.set("name", json!("Jane"));
        let out = JsonAction.execute(&values);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&out).unwrap(), json!({"name": "Jane"}));
    }
}
