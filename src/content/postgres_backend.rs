//! PostgreSQL content and recipient backends.
//!
//! Table structure:
//! - `news_items` - id, title, url, body, created_at, fields (jsonb)
//! - `users` - id, name, email, status
//!
//! Active users are streamed with keyset pagination so the full recipient
//! set is never loaded at once.

use std::collections::HashMap;

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::store::{ContentStore, RecipientSource, RecipientStream, StoreError};
use super::{ContentItem, FieldValue, Recipient, RecipientStatus};

type NewsRow = (
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    Json<HashMap<String, FieldValue>>,
);

/// PostgreSQL-backed content store.
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        let row: Option<NewsRow> = sqlx::query_as(
            r#"
            SELECT id, title, url, body, created_at, fields
            FROM news_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, title, url, body, created_at, Json(fields))| ContentItem {
            id,
            title,
            url,
            body,
            created_at,
            fields,
        }))
    }
}

/// PostgreSQL-backed recipient source.
pub struct PostgresRecipientSource {
    pool: PgPool,
    page_size: usize,
}

impl PostgresRecipientSource {
    pub fn new(pool: PgPool, page_size: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl RecipientSource for PostgresRecipientSource {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn active_recipients(&self) -> Result<RecipientStream, StoreError> {
        let pool = self.pool.clone();
        let page_size = self.page_size;

        let stream: RecipientStream = Box::pin(try_stream! {
            let mut after: Option<String> = None;

            loop {
                let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
                    r#"
                    SELECT id, name, email
                    FROM users
                    WHERE status = 'active' AND ($1::text IS NULL OR id > $1)
                    ORDER BY id
                    LIMIT $2
                    "#,
                )
                .bind(after.clone())
                .bind(page_size as i64)
                .fetch_all(&pool)
                .await
                .map_err(StoreError::from)?;

                let fetched = rows.len();
                tracing::trace!(fetched = fetched, after = ?after, "Fetched recipient page");

                for (id, name, email) in rows {
                    after = Some(id.clone());
                    yield Recipient {
                        id,
                        name,
                        email,
                        status: RecipientStatus::Active,
                    };
                }

                if fetched < page_size {
                    break;
                }
            }
        });

        Ok(stream)
    }
}
