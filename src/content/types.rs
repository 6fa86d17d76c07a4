use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news item being rendered and announced.
///
/// Immutable for the duration of a fan-out; shared between dispatch tasks
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Canonical URL
    pub url: String,
    /// Processed body text
    #[serde(default)]
    pub body: String,
    /// Entity creation time, the fallback for missing date fields
    pub created_at: DateTime<Utc>,
    /// Named optional fields (publish_date, featured_image, tags, ...)
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

/// Value of a named content field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Timestamp(DateTime<Utc>),
    Media(MediaRef),
    Tags(Vec<String>),
    Text(String),
}

/// Reference to a media entity (image)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl ContentItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            body: String::new(),
            created_at,
            fields: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl FieldValue {
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaRef> {
        match self {
            FieldValue::Media(media) => Some(media),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            FieldValue::Tags(tags) => Some(tags),
            _ => None,
        }
    }
}

/// Account status; only active recipients receive notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    #[default]
    Active,
    Blocked,
}

/// A user account that may receive notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    /// Display name
    pub name: String,
    /// Delivery address for the email channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub status: RecipientStatus,
}

impl Recipient {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            status: RecipientStatus::Active,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn blocked(mut self) -> Self {
        self.status = RecipientStatus::Blocked;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RecipientStatus::Active
    }
}
