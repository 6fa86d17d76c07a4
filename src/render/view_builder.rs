use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::RenderConfig;
use crate::content::{ContentItem, ContentStore};
use crate::fanout::NotificationFanoutService;
use crate::metrics::RenderMetrics;

use super::date::format_pattern;
use super::tree::{RenderElement, RenderTree, StyledImage, ViewMode};

/// Field holding the featured image media reference
pub const FEATURED_IMAGE_FIELD: &str = "featured_image";
/// Field holding the explicit publish date
pub const PUBLISH_DATE_FIELD: &str = "publish_date";
/// Field holding the tag list
pub const TAGS_FIELD: &str = "tags";

/// Builds the full and teaser views of a news item.
///
/// Rendering a full page also announces the item to every active recipient.
/// The fan-out runs on a background task; the page never waits for it and
/// never fails because of it.
pub struct NewsViewBuilder {
    content: Arc<dyn ContentStore>,
    fanout: Option<Arc<NotificationFanoutService>>,
    config: RenderConfig,
}

impl NewsViewBuilder {
    pub fn new(
        content: Arc<dyn ContentStore>,
        fanout: Option<Arc<NotificationFanoutService>>,
        config: RenderConfig,
    ) -> Self {
        Self {
            content,
            fanout,
            config,
        }
    }

    /// Full view: hero image and title, tags, body text
    #[tracing::instrument(name = "render.full", skip(self, subject), fields(subject_id = %subject.id))]
    pub fn render_full(&self, subject: Arc<ContentItem>) -> RenderTree {
        let mut tree = RenderTree::new(ViewMode::Full);

        // No wrapper, the hero takes the full width
        let image = self
            .content
            .resolve_field(&subject, FEATURED_IMAGE_FIELD)
            .and_then(|value| value.as_media().map(StyledImage::original));
        tree.push(RenderElement::Hero {
            title: subject.title.clone(),
            image,
        });

        let tags = self
            .content
            .resolve_field(&subject, TAGS_FIELD)
            .and_then(|value| value.as_tags().map(<[String]>::to_vec))
            .unwrap_or_default();
        tree.push(RenderElement::wide(RenderElement::Tags { tags }));

        tree.push(RenderElement::wide(RenderElement::Prose {
            text: subject.body.clone(),
        }));

        RenderMetrics::record_full();
        self.deliver_message(subject);

        tree
    }

    /// Teaser view: compact card with image, title, date and link
    #[tracing::instrument(name = "render.teaser", skip(self, subject), fields(subject_id = %subject.id))]
    pub fn render_teaser(&self, subject: &ContentItem) -> RenderTree {
        let image = self
            .content
            .resolve_field(subject, FEATURED_IMAGE_FIELD)
            .and_then(|value| {
                value
                    .as_media()
                    .map(|media| StyledImage::styled(media, &self.config.image_style))
            });
        let timestamp = self.content.field_or_created(subject, PUBLISH_DATE_FIELD);

        let mut tree = RenderTree::new(ViewMode::Teaser);
        tree.push(RenderElement::Card {
            title: subject.title.clone(),
            image,
            date: format_pattern(timestamp, &self.config.date_pattern),
            url: subject.url.clone(),
        });

        RenderMetrics::record_teaser();
        tree
    }

    /// Start a background fan-out for `subject`.
    ///
    /// Returns `None` when no fan-out service is configured or when called
    /// outside a Tokio runtime. Errors are logged and counted, never
    /// returned to the caller.
    pub fn deliver_message(&self, subject: Arc<ContentItem>) -> Option<JoinHandle<()>> {
        let fanout = self.fanout.clone()?;
        let subject_id = subject.id.clone();

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                subject_id = %subject_id,
                "No Tokio runtime available, news item not announced"
            );
            return None;
        };

        let handle = runtime.spawn(
            async move {
                match fanout.notify_all(subject).await {
                    Ok(report) => tracing::debug!(
                        message_id = %report.message_id,
                        dispatched = report.dispatched,
                        "Background fan-out completed"
                    ),
                    Err(e) => tracing::error!(
                        subject_id = %subject_id,
                        error = %e,
                        "Background fan-out failed"
                    ),
                }
            }
            .in_current_span(),
        );

        Some(handle)
    }
}
