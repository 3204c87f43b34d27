//! Schema catalog and per-session form storage
//!
//! [`SessionContext`] owns the forms of one conversation. All mutation goes
//! through [`FormRegistry`] and the state machine, which keep at most one
//! form active per session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::instance::{FormInstance, FormState};
use crate::schema::FormSchema;
use crate::FormError;

/// Forms of one conversation session
#[derive(Debug, Default)]
pub struct SessionContext {
    forms: HashMap<String, FormInstance>,
    active_keys: Vec<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FormInstance> {
        self.forms.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.forms.contains_key(key)
    }

    pub fn active_keys(&self) -> &[String] {
        &self.active_keys
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active_keys
            .first()
            .map(String::as_str)
            .filter(|key| self.forms.contains_key(*key))
    }

    /// The form currently eligible to intercept turns
    pub fn active(&self) -> Option<&FormInstance> {
        self.active_key().and_then(|key| self.forms.get(key))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut FormInstance> {
        let key = self.active_keys.first()?;
        self.forms.get_mut(key)
    }

    /// Store a form and make it the only active one
    fn activate(&mut self, instance: FormInstance) {
        let key = instance.key().to_string();

        for other in std::mem::take(&mut self.active_keys) {
            if other != key && self.forms.remove(&other).is_some() {
                tracing::info!(form = %other, superseded_by = %key, "Form superseded");
            }
        }
        // forms outside the active list cannot exist, but keep the map in step
        self.forms.retain(|k, _| *k == key);

        self.forms.entry(key.clone()).or_insert(instance);
        self.active_keys.push(key);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<FormInstance> {
        self.active_keys.retain(|k| k != key);
        self.forms.remove(key)
    }
}

/// Catalog of known schemas
#[derive(Debug, Default)]
pub struct FormRegistry {
    schemas: RwLock<HashMap<String, Arc<FormSchema>>>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema; replaces an existing one with the same key
    pub fn register(&self, schema: FormSchema) -> Arc<FormSchema> {
        let schema = Arc::new(schema);
        let previous = self
            .schemas
            .write()
            .insert(schema.key().to_string(), schema.clone());

        if previous.is_some() {
            tracing::warn!(form = schema.key(), "Schema replaced");
        } else {
            tracing::debug!(form = schema.key(), fields = schema.fields().len(), "Schema registered");
        }
        schema
    }

    pub fn schema(&self, key: &str) -> Option<Arc<FormSchema>> {
        self.schemas.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.schemas.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Start (or resume) the form for `key` and make it the only active one
    ///
    /// Any other form in the session is destroyed without running its action.
    pub fn start<'s>(&self, session: &'s mut SessionContext, key: &str) -> Result<&'s FormInstance, FormError> {
        let instance = match session.forms.remove(key) {
            Some(existing) => existing,
            None => {
                let schema = self
                    .schema(key)
                    .ok_or_else(|| FormError::UnknownSchema(key.to_string()))?;
                tracing::info!(form = key, "Form started");
                FormInstance::new(schema)
            }
        };

        session.activate(instance);
        session
            .get(key)
            .ok_or_else(|| FormError::UnknownSchema(key.to_string()))
    }

    /// Stop the form for `key` without running its action
    pub fn stop(&self, session: &mut SessionContext, key: &str) -> bool {
        match session.remove(key) {
            Some(mut instance) => {
                instance.set_state(FormState::Stopped);
                tracing::info!(form = key, turns = instance.turns(), "Form stopped");
                true
            }
            None => false,
        }
    }

    pub fn get_active<'s>(&self, session: &'s SessionContext) -> Option<&'s FormInstance> {
        session.active()
    }
}
