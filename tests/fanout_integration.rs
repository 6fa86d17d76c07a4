//! End-to-end fan-out behaviour against in-memory backends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use news_fanout_service::config::FanoutConfig;
use futures::stream::{self, StreamExt};

use news_fanout_service::content::{
    ContentItem, MemoryRecipientStore, Recipient, RecipientSource, RecipientStream, StoreError,
};
use news_fanout_service::fanout::{FanoutError, NotificationFanoutService};
use news_fanout_service::message::{
    default_templates, CalcStrategy, MemoryMessageStore, MessageStore, NotificationInstance,
    NotificationTemplate, ResolveError, TemplateRegistry, NEWS_ITEM_TEMPLATE,
};
use news_fanout_service::notifier::{Notifier, NotifierError, SendOptions};

#[derive(Debug, Clone)]
struct Delivery {
    recipient_id: String,
    subject: String,
    body: String,
    correlation_id: Option<String>,
}

/// Renders every message it is handed and keeps the result
#[derive(Default)]
struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    fn deliveries(&self) -> Vec<Delivery> {
        let mut out = self.deliveries.lock().unwrap().clone();
        out.sort_by(|a, b| a.recipient_id.cmp(&b.recipient_id));
        out
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(
        &self,
        message: &NotificationInstance,
        options: &SendOptions,
        _channel: &str,
    ) -> Result<(), NotifierError> {
        let rendered = message.render()?;
        let recipient_id = message
            .owner()
            .map(|o| o.id.clone())
            .ok_or_else(|| NotifierError::NoAddress("unbound".to_string()))?;

        self.deliveries.lock().unwrap().push(Delivery {
            recipient_id,
            subject: rendered.subject,
            body: rendered.body,
            correlation_id: options.correlation_id.clone(),
        });
        Ok(())
    }
}

/// Hangs for one recipient, panics for another, records the rest
struct MisbehavingNotifier {
    hang_for: &'static str,
    panic_for: &'static str,
    inner: RecordingNotifier,
}

#[async_trait]
impl Notifier for MisbehavingNotifier {
    fn name(&self) -> &'static str {
        "misbehaving"
    }

    async fn send(
        &self,
        message: &NotificationInstance,
        options: &SendOptions,
        channel: &str,
    ) -> Result<(), NotifierError> {
        let id = message.owner().map(|o| o.id.as_str()).unwrap_or_default();
        if id == self.hang_for {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if id == self.panic_for {
            panic!("transport exploded");
        }
        self.inner.send(message, options, channel).await
    }
}

struct FailingMessageStore;

#[async_trait]
impl MessageStore for FailingMessageStore {
    fn backend_type(&self) -> &'static str {
        "failing"
    }

    async fn save(&self, _message: &NotificationInstance) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// Fails to open, or yields `healthy` recipients and then an error
struct BrokenRecipientSource {
    healthy: usize,
    fail_on_open: bool,
}

#[async_trait]
impl RecipientSource for BrokenRecipientSource {
    fn backend_type(&self) -> &'static str {
        "broken"
    }

    async fn active_recipients(&self) -> Result<RecipientStream, StoreError> {
        if self.fail_on_open {
            return Err(StoreError::Unavailable("users table locked".to_string()));
        }

        let mut items: Vec<Result<Recipient, StoreError>> = (0..self.healthy)
            .map(|i| Ok(Recipient::new(format!("u{}", i), format!("User {}", i))))
            .collect();
        items.push(Err(StoreError::Unavailable("connection reset".to_string())));
        // Never reached: the run stops at the first error
        items.push(Ok(Recipient::new("late", "Late")));

        Ok(stream::iter(items).boxed())
    }
}

fn config() -> FanoutConfig {
    FanoutConfig {
        concurrency: 4,
        dispatch_timeout_ms: 200,
        calc: CalcStrategy::Disabled,
        ..FanoutConfig::default()
    }
}

fn subject() -> Arc<ContentItem> {
    Arc::new(ContentItem::new(
        "42",
        "Town hall moved",
        "https://example.com/news/town-hall",
        Utc::now(),
    ))
}

fn recipients(list: &[(&str, &str)]) -> Arc<MemoryRecipientStore> {
    let store = MemoryRecipientStore::new();
    for (id, name) in list {
        store.insert(Recipient::new(*id, *name));
    }
    Arc::new(store)
}

fn service(
    messages: Arc<dyn MessageStore>,
    recipients: Arc<MemoryRecipientStore>,
    notifier: Arc<dyn Notifier>,
) -> NotificationFanoutService {
    NotificationFanoutService::new(
        default_templates(CalcStrategy::Disabled),
        messages,
        recipients,
        notifier,
        config(),
    )
}

#[tokio::test]
async fn test_one_persist_and_one_dispatch_per_recipient() {
    let messages = Arc::new(MemoryMessageStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(
        messages.clone(),
        recipients(&[("a", "Alice"), ("b", "Bob"), ("c", "Carol")]),
        notifier.clone(),
    );

    let report = svc.notify_all(subject()).await.unwrap();

    assert_eq!(report.recipients, 3);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(messages.count().await.unwrap(), 1);

    let record = messages.get(report.message_id).unwrap();
    assert_eq!(record.subject_id, "42");
    assert_eq!(record.template, NEWS_ITEM_TEMPLATE);
    assert!(record.owner_id.is_none());

    let correlation = report.message_id.to_string();
    assert!(notifier
        .deliveries()
        .iter()
        .all(|d| d.correlation_id.as_deref() == Some(correlation.as_str())));
}

#[tokio::test]
async fn test_each_duplicate_resolves_its_own_owner() {
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(
        Arc::new(MemoryMessageStore::new()),
        recipients(&[("a", "Alice"), ("b", "Bob")]),
        notifier.clone(),
    );

    svc.notify_all(subject()).await.unwrap();

    let deliveries = notifier.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries[0].body.starts_with("Hello Alice,"));
    assert!(deliveries[1].body.starts_with("Hello Bob,"));
    for d in &deliveries {
        assert_eq!(d.subject, "New: Town hall moved");
        assert!(d.body.contains("https://example.com/news/town-hall"));
    }
}

#[tokio::test]
async fn test_repeated_runs_are_not_deduplicated() {
    let messages = Arc::new(MemoryMessageStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(
        messages.clone(),
        recipients(&[("a", "Alice"), ("b", "Bob")]),
        notifier.clone(),
    );

    let first = svc.notify_all(subject()).await.unwrap();
    let second = svc.notify_all(subject()).await.unwrap();

    assert_ne!(first.message_id, second.message_id);
    assert_eq!(messages.count().await.unwrap(), 2);
    assert_eq!(notifier.deliveries().len(), 4);
    assert_eq!(svc.stats().runs, 2);
}

#[tokio::test]
async fn test_no_recipients_still_persists() {
    let messages = Arc::new(MemoryMessageStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(messages.clone(), recipients(&[]), notifier.clone());

    let report = svc.notify_all(subject()).await.unwrap();

    assert_eq!(report.recipients, 0);
    assert_eq!(report.dispatched, 0);
    assert_eq!(messages.count().await.unwrap(), 1);
    assert!(notifier.deliveries().is_empty());
}

#[tokio::test]
async fn test_blocked_recipients_skipped() {
    let store = MemoryRecipientStore::new();
    store.insert(Recipient::new("a", "Alice"));
    store.insert(Recipient::new("b", "Bob").blocked());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(
        Arc::new(MemoryMessageStore::new()),
        Arc::new(store),
        notifier.clone(),
    );

    let report = svc.notify_all(subject()).await.unwrap();

    assert_eq!(report.recipients, 1);
    let deliveries = notifier.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].recipient_id, "a");
}

#[tokio::test]
async fn test_resolution_failure_isolated_to_one_recipient() {
    let templates = TemplateRegistry::new();
    templates.register(
        NotificationTemplate::new(NEWS_ITEM_TEMPLATE, "Hi {{user}}", "{{user}}")
            .deferred("user", |message: &NotificationInstance| {
                let owner = message.owner().ok_or(ResolveError::MissingOwner)?;
                if owner.id == "b" {
                    return Err(ResolveError::Failed("directory lookup failed".to_string()));
                }
                Ok(owner.name.clone())
            }),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = NotificationFanoutService::new(
        Arc::new(templates),
        Arc::new(MemoryMessageStore::new()),
        recipients(&[("a", "Alice"), ("b", "Bob"), ("c", "Carol")]),
        notifier.clone(),
        config(),
    );

    let report = svc.notify_all(subject()).await.unwrap();

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.failed, 1);
    let ids: Vec<_> = notifier
        .deliveries()
        .into_iter()
        .map(|d| d.recipient_id)
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_persist_failure_sends_nothing() {
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = service(
        Arc::new(FailingMessageStore),
        recipients(&[("a", "Alice"), ("b", "Bob")]),
        notifier.clone(),
    );

    let result = svc.notify_all(subject()).await;

    assert!(matches!(result, Err(FanoutError::Persist(_))));
    assert!(notifier.deliveries().is_empty());
    assert_eq!(svc.stats().persist_failures, 1);
    assert_eq!(svc.stats().recipients, 0);
}

#[tokio::test]
async fn test_hung_and_panicking_sends_do_not_block_others() {
    let notifier = Arc::new(MisbehavingNotifier {
        hang_for: "b",
        panic_for: "c",
        inner: RecordingNotifier::default(),
    });
    let svc = service(
        Arc::new(MemoryMessageStore::new()),
        recipients(&[("a", "Alice"), ("b", "Bob"), ("c", "Carol"), ("d", "Dan")]),
        notifier.clone(),
    );

    let report = tokio::time::timeout(Duration::from_secs(5), svc.notify_all(subject()))
        .await
        .expect("fan-out should finish well before the hung send")
        .unwrap();

    assert_eq!(report.recipients, 4);
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.timed_out, 1);
    assert_eq!(report.failed, 1);

    let ids: Vec<_> = notifier
        .inner
        .deliveries()
        .into_iter()
        .map(|d| d.recipient_id)
        .collect();
    assert_eq!(ids, vec!["a", "d"]);
}

#[tokio::test]
async fn test_cancellation_mid_run_stops_drawing_recipients() {
    let list: Vec<(String, String)> = (0..50)
        .map(|i| (format!("u{:02}", i), format!("User {}", i)))
        .collect();
    let store = MemoryRecipientStore::new();
    for (id, name) in &list {
        store.insert(Recipient::new(id.clone(), name.clone()));
    }

    /// Cancels the run once the first delivery lands
    struct CancellingNotifier {
        cancel: tokio::sync::watch::Sender<bool>,
        inner: RecordingNotifier,
    }

    #[async_trait]
    impl Notifier for CancellingNotifier {
        fn name(&self) -> &'static str {
            "cancelling"
        }

        async fn send(
            &self,
            message: &NotificationInstance,
            options: &SendOptions,
            channel: &str,
        ) -> Result<(), NotifierError> {
            self.inner.send(message, options, channel).await?;
            let _ = self.cancel.send(true);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        }
    }

    let (tx, rx) = tokio::sync::watch::channel(false);
    let notifier = Arc::new(CancellingNotifier {
        cancel: tx,
        inner: RecordingNotifier::default(),
    });
    let svc = NotificationFanoutService::new(
        default_templates(CalcStrategy::Disabled),
        Arc::new(MemoryMessageStore::new()),
        Arc::new(store),
        notifier.clone(),
        FanoutConfig {
            concurrency: 2,
            ..config()
        },
    );

    let report = svc.notify_all_until(subject(), rx).await.unwrap();

    assert!(report.cancelled);
    assert!(report.recipients < 50);
    // Everything already drawn was allowed to finish
    assert_eq!(report.dispatched, report.recipients);
    assert_eq!(notifier.inner.deliveries().len(), report.recipients);
}

#[tokio::test]
async fn test_recipient_source_failing_to_open() {
    let messages = Arc::new(MemoryMessageStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = NotificationFanoutService::new(
        default_templates(CalcStrategy::Disabled),
        messages.clone(),
        Arc::new(BrokenRecipientSource {
            healthy: 0,
            fail_on_open: true,
        }),
        notifier.clone(),
        config(),
    );

    let result = svc.notify_all(subject()).await;

    assert!(matches!(result, Err(FanoutError::Recipients(_))));
    assert_eq!(messages.count().await.unwrap(), 1);
    assert!(notifier.deliveries().is_empty());
    assert_eq!(svc.stats().recipient_failures, 1);
}

#[tokio::test]
async fn test_recipient_stream_failing_mid_run_drains_started_sends() {
    let messages = Arc::new(MemoryMessageStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = NotificationFanoutService::new(
        default_templates(CalcStrategy::Disabled),
        messages.clone(),
        Arc::new(BrokenRecipientSource {
            healthy: 3,
            fail_on_open: false,
        }),
        notifier.clone(),
        config(),
    );

    let result = svc.notify_all(subject()).await;

    assert!(matches!(result, Err(FanoutError::Recipients(_))));
    assert_eq!(messages.count().await.unwrap(), 1);

    // Recipients drawn before the error were all delivered before returning
    let ids: Vec<_> = notifier
        .deliveries()
        .into_iter()
        .map(|d| d.recipient_id)
        .collect();
    assert_eq!(ids, vec!["u0", "u1", "u2"]);

    let stats = svc.stats();
    assert_eq!(stats.recipient_failures, 1);
    assert_eq!(stats.dispatched, 3);
}
