//! JSON fixtures for seeding the in-memory backends.

use std::path::Path;

use serde::Deserialize;

use super::memory_backend::{MemoryContentStore, MemoryRecipientStore};
use super::store::StoreError;
use super::{ContentItem, Recipient};

/// Seed data: `{"content": [...], "recipients": [...]}`
#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Fixtures {
    /// Read fixtures from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixtures(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Insert every item and recipient into the given stores
    pub fn apply(self, content: &MemoryContentStore, recipients: &MemoryRecipientStore) {
        let (items, users) = (self.content.len(), self.recipients.len());

        for item in self.content {
            content.insert(item);
        }
        for recipient in self.recipients {
            recipients.insert(recipient);
        }

        tracing::info!(items = items, recipients = users, "Fixtures loaded");
    }
}
