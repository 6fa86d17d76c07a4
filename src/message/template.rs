//! Message templates with deferred placeholder arguments.
//!
//! A template declares a subject and body with `{{name}}` placeholders and
//! maps each placeholder name to an [`Argument`]. Deferred arguments are
//! closures that receive the fully bound [`NotificationInstance`] when the
//! message is rendered, so a single template can produce per-recipient text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use super::NotificationInstance;

/// Error raised by a deferred placeholder resolver
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("message has no owner bound")]
    MissingOwner,

    #[error("subject is missing field: {0}")]
    MissingField(String),

    #[error("{0}")]
    Failed(String),
}

/// Error raised while rendering a message
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("placeholder '{placeholder}' could not be resolved: {source}")]
    Resolve {
        placeholder: String,
        #[source]
        source: ResolveError,
    },
}

/// Computes a placeholder value from the bound message
pub type Resolver =
    Arc<dyn Fn(&NotificationInstance) -> Result<String, ResolveError> + Send + Sync>;

/// Value source for a single placeholder
#[derive(Clone)]
pub enum Argument {
    /// Fixed at template definition time
    Literal(String),
    /// Computed from the bound message at render time
    Deferred(Resolver),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Argument::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A message template definition
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    key: String,
    subject: String,
    body: String,
    arguments: BTreeMap<String, Argument>,
}

impl NotificationTemplate {
    pub fn new(key: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            subject: subject.into(),
            body: body.into(),
            arguments: BTreeMap::new(),
        }
    }

    /// Bind a placeholder to a fixed value
    pub fn literal(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments
            .insert(name.into(), Argument::Literal(value.into()));
        self
    }

    /// Bind a placeholder to a resolver invoked at render time
    pub fn deferred<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&NotificationInstance) -> Result<String, ResolveError> + Send + Sync + 'static,
    {
        self.arguments
            .insert(name.into(), Argument::Deferred(Arc::new(resolver)));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn arguments(&self) -> impl Iterator<Item = (&String, &Argument)> {
        self.arguments.iter()
    }

    /// Names of all declared placeholders
    pub fn placeholder_names(&self) -> Vec<&str> {
        self.arguments.keys().map(String::as_str).collect()
    }
}

/// Substitute `{{name}}` placeholders in a string.
///
/// The template is scanned once, left to right; substituted values are
/// copied verbatim and never rescanned. Unknown or unterminated
/// placeholders are left in place.
pub fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            result.push_str(&rest[start..]);
            return result;
        };

        let name = &after_open[..end];
        match values.get(name) {
            Some(value) => result.push_str(value),
            None => {
                result.push_str("{{");
                result.push_str(name);
                result.push_str("}}");
            }
        }
        rest = &after_open[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Registry of templates by key
#[derive(Default)]
pub struct TemplateRegistry {
    templates: DashMap<String, Arc<NotificationTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any existing one with the same key
    pub fn register(&self, template: NotificationTemplate) -> Arc<NotificationTemplate> {
        let template = Arc::new(template);
        self.templates
            .insert(template.key().to_string(), template.clone());
        template
    }

    pub fn get(&self, key: &str) -> Option<Arc<NotificationTemplate>> {
        self.templates.get(key).map(|t| t.clone())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn count(&self) -> usize {
        self.templates.len()
    }
}
