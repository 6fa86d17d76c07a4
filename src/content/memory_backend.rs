//! In-memory content and recipient backends using DashMap.
//!
//! Data lives only for the life of the process; used for development
//! fixtures and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};

use super::store::{ContentStore, RecipientSource, RecipientStream, StoreError};
use super::{ContentItem, Recipient, RecipientStatus};

/// In-memory content store.
#[derive(Default)]
pub struct MemoryContentStore {
    items: DashMap<String, ContentItem>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item
    pub fn insert(&self, item: ContentItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        Ok(self.items.get(id).map(|item| item.clone()))
    }
}

/// In-memory recipient store.
#[derive(Default)]
pub struct MemoryRecipientStore {
    recipients: DashMap<String, Recipient>,
}

impl MemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a recipient
    pub fn insert(&self, recipient: Recipient) {
        self.recipients.insert(recipient.id.clone(), recipient);
    }

    /// Change a recipient's status; returns false if the ID is unknown
    pub fn set_status(&self, id: &str, status: RecipientStatus) -> bool {
        match self.recipients.get_mut(id) {
            Some(mut recipient) => {
                recipient.status = status;
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.recipients.len()
    }
}

#[async_trait]
impl RecipientSource for MemoryRecipientStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn active_recipients(&self) -> Result<RecipientStream, StoreError> {
        // Snapshot so no DashMap guard is held while the stream is consumed
        let mut active: Vec<Recipient> = self
            .recipients
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!(count = active.len(), "Snapshot of active recipients taken");

        Ok(stream::iter(active.into_iter().map(Ok)).boxed())
    }
}
