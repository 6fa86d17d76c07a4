//! The `news_item` template announcing a published news item.

use rand::Rng;
use serde::Deserialize;

use super::template::{NotificationTemplate, ResolveError};
use super::NotificationInstance;

/// Template key used for news announcements
pub const NEWS_ITEM_TEMPLATE: &str = "news_item";

/// How the `calc` placeholder is computed for each message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalcStrategy {
    /// "Calculated as N", N drawn uniformly from 1..=9999 per message
    #[default]
    Random,
    /// Renders an empty string
    Disabled,
}

/// Build the `news_item` template.
///
/// Placeholders:
/// - `title`: the subject's display title
/// - `url`: the subject's canonical URL
/// - `user`: the bound recipient's display name
/// - `calc`: per-message computed value, see [`CalcStrategy`]
pub fn news_item_template(calc: CalcStrategy) -> NotificationTemplate {
    NotificationTemplate::new(
        NEWS_ITEM_TEMPLATE,
        "New: {{title}}",
        "Hello {{user}},\n\n\"{{title}}\" has just been published.\nRead it at {{url}}\n\n{{calc}}\n",
    )
    .deferred("title", message_title)
    .deferred("url", message_url)
    .deferred("user", message_user)
    .deferred("calc", move |message| message_calc(calc, message))
}

fn message_title(message: &NotificationInstance) -> Result<String, ResolveError> {
    Ok(message.subject().title.clone())
}

fn message_url(message: &NotificationInstance) -> Result<String, ResolveError> {
    let url = &message.subject().url;
    if url.is_empty() {
        return Err(ResolveError::MissingField("url".to_string()));
    }
    Ok(url.clone())
}

fn message_user(message: &NotificationInstance) -> Result<String, ResolveError> {
    message
        .owner()
        .map(|owner| owner.name.clone())
        .ok_or(ResolveError::MissingOwner)
}

fn message_calc(
    strategy: CalcStrategy,
    _message: &NotificationInstance,
) -> Result<String, ResolveError> {
    match strategy {
        CalcStrategy::Random => {
            let n: u32 = rand::rng().random_range(1..=9999);
            Ok(format!("Calculated as {}", n))
        }
        CalcStrategy::Disabled => Ok(String::new()),
    }
}
