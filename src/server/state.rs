use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::config::Settings;
use crate::content::{create_content_backends, ContentStore, RecipientSource, StoreError};
use crate::fanout::NotificationFanoutService;
use crate::message::{create_message_store, default_templates, MessageStore};
use crate::notifier::{create_notifier, Notifier};
use crate::postgres::{PostgresPool, PostgresPoolError};
use crate::render::NewsViewBuilder;

/// Errors raised while wiring application state
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("PostgreSQL unavailable: {0}")]
    Postgres(#[from] PostgresPoolError),

    #[error("Storage setup failed: {0}")]
    Store(#[from] StoreError),
}

/// External collaborators the service is assembled from
pub struct Backends {
    pub content: Arc<dyn ContentStore>,
    pub recipients: Arc<dyn RecipientSource>,
    pub messages: Arc<dyn MessageStore>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentStore>,
    pub messages: Arc<dyn MessageStore>,
    pub notifier_name: &'static str,
    pub fanout: Arc<NotificationFanoutService>,
    pub view_builder: Arc<NewsViewBuilder>,
    pub postgres: Option<PostgresPool>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with backends selected by configuration.
    pub async fn new(settings: &Settings) -> Result<Self, StartupError> {
        let postgres = if settings.store.backend == "postgres" {
            let pool = PostgresPool::new(&settings.database).await?;
            pool.ensure_schema().await?;
            Some(pool)
        } else {
            None
        };
        let pg_pool = postgres.as_ref().map(|p| p.pool().clone());

        let (content, recipients) = create_content_backends(&settings.store, pg_pool.clone())?;
        let backends = Backends {
            content,
            recipients,
            messages: create_message_store(&settings.store, pg_pool),
            notifier: create_notifier(&settings.notifier),
        };

        let mut state = Self::with_backends(settings, backends);
        state.postgres = postgres;
        Ok(state)
    }

    /// Build state around explicitly provided backends
    pub fn with_backends(settings: &Settings, backends: Backends) -> Self {
        let templates = default_templates(settings.fanout.calc);
        if !templates.exists(&settings.fanout.template) {
            tracing::warn!(
                template = %settings.fanout.template,
                "Configured fan-out template is not registered, every fan-out will fail"
            );
        }
        let notifier_name = backends.notifier.name();

        let fanout = Arc::new(NotificationFanoutService::new(
            templates,
            backends.messages.clone(),
            backends.recipients,
            backends.notifier,
            settings.fanout.clone(),
        ));

        let view_builder = Arc::new(NewsViewBuilder::new(
            backends.content.clone(),
            Some(fanout.clone()),
            settings.render.clone(),
        ));

        Self {
            content: backends.content,
            messages: backends.messages,
            notifier_name,
            fanout,
            view_builder,
            postgres: None,
            started_at: Instant::now(),
        }
    }
}
