//! Messages, templates with deferred placeholders, and message persistence.
//!
//! # Store Architecture
//!
//! - `MemoryMessageStore`: In-memory storage using DashMap (default)
//! - `PostgresMessageStore`: `messages` table
//!
//! Use `create_message_store()` to create the appropriate backend based on configuration.

mod news;
mod store;
mod template;
mod types;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StoreConfig;

pub use news::{news_item_template, CalcStrategy, NEWS_ITEM_TEMPLATE};
pub use store::{MemoryMessageStore, MessageStore, PostgresMessageStore};
pub use template::{
    substitute, Argument, NotificationTemplate, RenderError, ResolveError, Resolver,
    TemplateRegistry,
};
pub use types::{MessageRecord, NotificationInstance, RenderedMessage};

/// Create a message store based on configuration.
///
/// - `"postgres"`: Returns a `PostgresMessageStore` if a pool is provided
/// - `"memory"` (default): Returns a `MemoryMessageStore`
pub fn create_message_store(settings: &StoreConfig, pg_pool: Option<PgPool>) -> Arc<dyn MessageStore> {
    match (settings.backend.as_str(), pg_pool) {
        ("postgres", Some(pool)) => {
            tracing::info!("Using PostgreSQL message store");
            Arc::new(PostgresMessageStore::new(pool))
        }
        ("postgres", None) => {
            tracing::warn!("PostgreSQL message store requested but no pool provided, falling back to memory");
            Arc::new(MemoryMessageStore::new())
        }
        _ => {
            tracing::info!("Using in-memory message store");
            Arc::new(MemoryMessageStore::new())
        }
    }
}

/// Registry pre-loaded with the built-in templates
pub fn default_templates(calc: CalcStrategy) -> Arc<TemplateRegistry> {
    let registry = TemplateRegistry::new();
    registry.register(news_item_template(calc));
    Arc::new(registry)
}
