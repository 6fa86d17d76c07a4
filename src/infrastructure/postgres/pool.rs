//! PostgreSQL connection pool shared by the storage backends.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Schema for `news_items`, `users` and `messages`; every statement is idempotent
const SCHEMA: &str = include_str!("../../../migrations/001_initial.sql");

#[derive(Debug, Error)]
pub enum PostgresPoolError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),
}

/// Pool handle plus the (masked) URL it was opened against.
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
    masked_url: String,
}

impl PostgresPool {
    /// Connect using the `database` settings section.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, PostgresPoolError> {
        let masked_url = mask_url(&config.url);

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .idle_timeout(Duration::from_secs(u64::from(config.idle_timeout_seconds)))
            .connect(&config.url)
            .await
            .map_err(|source| PostgresPoolError::Connect {
                url: masked_url.clone(),
                source,
            })?;

        tracing::info!(
            pool_size = config.pool_size,
            url = %masked_url,
            "PostgreSQL connection pool created"
        );

        Ok(Self { pool, masked_url })
    }

    /// Create missing tables and indexes.
    pub async fn ensure_schema(&self) -> Result<(), PostgresPoolError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(PostgresPoolError::Schema)?;
        tracing::info!("PostgreSQL schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open connections and how many of them are idle
    pub fn usage(&self) -> (u32, u32) {
        (self.pool.size(), self.pool.num_idle() as u32)
    }

    pub fn database_url_masked(&self) -> &str {
        &self.masked_url
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(url = %self.masked_url, "PostgreSQL connection pool closed");
    }
}

fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // "postgres://" itself contains a colon; only mask a password field
            if colon_pos > url.find("://").map(|p| p + 2).unwrap_or(0) {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}***{}", prefix, suffix);
            }
        }
    }
    url.to_string()
}
