//! Persistence of canonical messages.
//!
//! Only the canonical instance of a fan-out is saved; per-recipient
//! duplicates stay in memory.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::content::StoreError;

use super::{MessageRecord, NotificationInstance};

/// Message storage backend.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Persist a message
    async fn save(&self, message: &NotificationInstance) -> Result<(), StoreError>;

    /// Number of stored messages
    async fn count(&self) -> Result<u64, StoreError>;
}

/// In-memory message store.
#[derive(Default)]
pub struct MemoryMessageStore {
    records: DashMap<Uuid, MessageRecord>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<MessageRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, message: &NotificationInstance) -> Result<(), StoreError> {
        let record = message.record();
        tracing::debug!(
            message_id = %record.id,
            template = %record.template,
            subject_id = %record.subject_id,
            "Message saved"
        );
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.len() as u64)
    }
}

/// PostgreSQL-backed message store (`messages` table).
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn save(&self, message: &NotificationInstance) -> Result<(), StoreError> {
        let record = message.record();

        sqlx::query(
            r#"
            INSERT INTO messages (id, template, subject_id, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(&record.template)
        .bind(&record.subject_id)
        .bind(&record.owner_id)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(message_id = %record.id, "Message saved to PostgreSQL");
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::content::ContentItem;
    use crate::message::NotificationTemplate;

    #[tokio::test]
    async fn test_memory_save_and_count() {
        let store = MemoryMessageStore::new();
        let message = NotificationInstance::new(
            Arc::new(NotificationTemplate::new("news_item", "", "")),
            Arc::new(ContentItem::new("1", "A", "/a", Utc::now())),
        );

        store.save(&message).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(message.id()).unwrap().subject_id, "1");
    }
}
