//! News items, recipients, and the storage backends they come from.
//!
//! # Backend Architecture
//!
//! - `MemoryContentStore` / `MemoryRecipientStore`: DashMap-backed, seeded from fixtures
//! - `PostgresContentStore` / `PostgresRecipientSource`: `news_items` and `users` tables
//!
//! Use `create_content_backends()` to build the pair selected by configuration.

pub mod fixtures;
pub mod memory_backend;
pub mod postgres_backend;
mod store;
mod types;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StoreConfig;

pub use fixtures::Fixtures;
pub use memory_backend::{MemoryContentStore, MemoryRecipientStore};
pub use postgres_backend::{PostgresContentStore, PostgresRecipientSource};
pub use store::{ContentStore, RecipientSource, RecipientStream, StoreError};
pub use types::{ContentItem, FieldValue, MediaRef, Recipient, RecipientStatus};

/// Create the content store and recipient source based on configuration.
///
/// - `"postgres"`: PostgreSQL backends if a pool is provided
/// - `"memory"` (default): in-memory backends, seeded from `fixtures_path` if set
pub fn create_content_backends(
    settings: &StoreConfig,
    pg_pool: Option<PgPool>,
) -> Result<(Arc<dyn ContentStore>, Arc<dyn RecipientSource>), StoreError> {
    match (settings.backend.as_str(), pg_pool) {
        ("postgres", Some(pool)) => {
            tracing::info!(page_size = settings.page_size, "Using PostgreSQL content backends");
            Ok((
                Arc::new(PostgresContentStore::new(pool.clone())),
                Arc::new(PostgresRecipientSource::new(pool, settings.page_size)),
            ))
        }
        ("postgres", None) => {
            tracing::warn!("PostgreSQL content backend requested but no pool provided, falling back to memory");
            memory_backends(settings)
        }
        _ => {
            tracing::info!("Using in-memory content backends");
            memory_backends(settings)
        }
    }
}

fn memory_backends(
    settings: &StoreConfig,
) -> Result<(Arc<dyn ContentStore>, Arc<dyn RecipientSource>), StoreError> {
    let content = Arc::new(MemoryContentStore::new());
    let recipients = Arc::new(MemoryRecipientStore::new());

    if let Some(path) = &settings.fixtures_path {
        Fixtures::load(path)?.apply(&content, &recipients);
    }

    Ok((content, recipients))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_is_default() {
        let (content, recipients) = create_content_backends(&StoreConfig::default(), None).unwrap();
        assert_eq!(content.backend_type(), "memory");
        assert_eq!(recipients.backend_type(), "memory");
    }

    #[test]
    fn test_postgres_without_pool_falls_back() {
        let settings = StoreConfig {
            backend: "postgres".to_string(),
            ..StoreConfig::default()
        };
        let (content, _) = create_content_backends(&settings, None).unwrap();
        assert_eq!(content.backend_type(), "memory");
    }
}
