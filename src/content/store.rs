//! Storage traits for content items and recipients.
//!
//! Content storage and user enumeration belong to the host system; these
//! traits are the seams the fan-out and render layers depend on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

use super::{ContentItem, FieldValue, Recipient};

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Fixture file could not be read
    #[error("Fixture error: {0}")]
    Fixtures(String),

    /// Backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Lazy sequence of recipients; errors end the fan-out.
pub type RecipientStream = BoxStream<'static, Result<Recipient, StoreError>>;

/// Read access to news items.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Load an item by ID
    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError>;

    /// Look up a named field on an item
    fn resolve_field(&self, item: &ContentItem, name: &str) -> Option<FieldValue> {
        item.field(name).cloned()
    }

    /// Timestamp stored in `name`, or the item's creation time when absent.
    fn field_or_created(&self, item: &ContentItem, name: &str) -> DateTime<Utc> {
        self.resolve_field(item, name)
            .and_then(|value| value.as_timestamp())
            .unwrap_or(item.created_at)
    }
}

/// Source of currently active recipients.
#[async_trait]
pub trait RecipientSource: Send + Sync {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Open a stream over every active recipient.
    ///
    /// The status filter is applied when the stream is opened or paged;
    /// accounts blocked mid-stream may still appear.
    async fn active_recipients(&self) -> Result<RecipientStream, StoreError>;
}
