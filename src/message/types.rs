use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ContentItem, Recipient};

use super::template::{substitute, Argument, NotificationTemplate, RenderError};

/// One message, bound to a subject and (once duplicated) to a recipient.
///
/// The canonical instance is created once per fan-out and persisted; every
/// recipient gets its own duplicate via [`NotificationInstance::with_owner`].
/// Template and subject are shared read-only; the owner and the resolved
/// placeholder cache belong to each instance.
pub struct NotificationInstance {
    id: Uuid,
    template: Arc<NotificationTemplate>,
    subject: Arc<ContentItem>,
    owner: Option<Recipient>,
    created_at: DateTime<Utc>,
    resolved: OnceLock<HashMap<String, String>>,
}

/// Rendered subject and body, ready for a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Persisted form of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub template: String,
    pub subject_id: String,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationInstance {
    /// Create an unowned message about `subject`
    pub fn new(template: Arc<NotificationTemplate>, subject: Arc<ContentItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            subject,
            owner: None,
            created_at: Utc::now(),
            resolved: OnceLock::new(),
        }
    }

    /// Duplicate this message for `owner`.
    ///
    /// The duplicate gets a fresh ID and an empty resolution cache, so its
    /// placeholders are resolved against the new owner.
    pub fn with_owner(&self, owner: Recipient) -> Self {
        Self {
            id: Uuid::new_v4(),
            template: self.template.clone(),
            subject: self.subject.clone(),
            owner: Some(owner),
            created_at: Utc::now(),
            resolved: OnceLock::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn template(&self) -> &NotificationTemplate {
        &self.template
    }

    pub fn subject(&self) -> &ContentItem {
        &self.subject
    }

    pub fn owner(&self) -> Option<&Recipient> {
        self.owner.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether placeholders have already been resolved for this instance
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolve every placeholder, caching the result on success.
    ///
    /// Resolvers run at most once per successfully rendered instance. A
    /// failure is not cached.
    pub fn resolve(&self) -> Result<&HashMap<String, String>, RenderError> {
        if let Some(values) = self.resolved.get() {
            return Ok(values);
        }

        let mut values = HashMap::new();
        for (name, argument) in self.template.arguments() {
            let value = match argument {
                Argument::Literal(value) => value.clone(),
                Argument::Deferred(resolver) => {
                    resolver(self).map_err(|source| RenderError::Resolve {
                        placeholder: name.clone(),
                        source,
                    })?
                }
            };
            values.insert(name.clone(), value);
        }

        Ok(self.resolved.get_or_init(|| values))
    }

    /// Resolved value of a single placeholder
    pub fn argument(&self, name: &str) -> Result<Option<&str>, RenderError> {
        Ok(self.resolve()?.get(name).map(String::as_str))
    }

    /// Render the template subject and body for this instance
    pub fn render(&self) -> Result<RenderedMessage, RenderError> {
        let values = self.resolve()?;
        Ok(RenderedMessage {
            subject: substitute(self.template.subject(), values),
            body: substitute(self.template.body(), values),
        })
    }

    /// Storage representation
    pub fn record(&self) -> MessageRecord {
        MessageRecord {
            id: self.id,
            template: self.template.key().to_string(),
            subject_id: self.subject.id.clone(),
            owner_id: self.owner.as_ref().map(|o| o.id.clone()),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for NotificationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationInstance")
            .field("id", &self.id)
            .field("template", &self.template.key())
            .field("subject", &self.subject.id)
            .field("owner", &self.owner.as_ref().map(|o| &o.id))
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
