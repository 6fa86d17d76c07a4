use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::config::FanoutConfig;
use crate::content::{ContentItem, Recipient, RecipientSource, StoreError};
use crate::message::{MessageStore, NotificationInstance, TemplateRegistry};
use crate::metrics::FanoutMetrics;
use crate::notifier::{Notifier, SendOptions};

use super::stats::{DispatchOutcome, FanoutReport, FanoutStats, FanoutStatsSnapshot};

/// Errors that abort a whole fan-out run.
///
/// Per-recipient failures never surface here; they are counted in the
/// [`FanoutReport`].
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("Template not registered: {0}")]
    TemplateNotFound(String),

    #[error("Failed to persist canonical message: {0}")]
    Persist(#[source] StoreError),

    #[error("Failed to fetch recipients: {0}")]
    Recipients(#[source] StoreError),
}

/// Announces a content item to every active recipient.
///
/// One canonical message is built and persisted before anything is sent.
/// Each active recipient then gets an in-memory duplicate bound to them,
/// dispatched on its own task through the notifier. At most
/// `concurrency` dispatches are in flight at once and each one is bounded
/// by `dispatch_timeout_ms`.
pub struct NotificationFanoutService {
    templates: Arc<TemplateRegistry>,
    messages: Arc<dyn MessageStore>,
    recipients: Arc<dyn RecipientSource>,
    notifier: Arc<dyn Notifier>,
    config: FanoutConfig,
    stats: FanoutStats,
}

impl NotificationFanoutService {
    pub fn new(
        templates: Arc<TemplateRegistry>,
        messages: Arc<dyn MessageStore>,
        recipients: Arc<dyn RecipientSource>,
        notifier: Arc<dyn Notifier>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            templates,
            messages,
            recipients,
            notifier,
            config,
            stats: FanoutStats::default(),
        }
    }

    /// Get fan-out statistics
    pub fn stats(&self) -> FanoutStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Notify every active recipient about `subject`.
    pub async fn notify_all(&self, subject: Arc<ContentItem>) -> Result<FanoutReport, FanoutError> {
        let (_keep_open, cancel) = watch::channel(false);
        self.notify_all_until(subject, cancel).await
    }

    /// Like [`notify_all`](Self::notify_all), but stops drawing recipients
    /// once `cancel` becomes `true`.
    ///
    /// Dispatches already started are allowed to finish; recipients not yet
    /// drawn receive nothing.
    #[tracing::instrument(
        name = "fanout.notify_all",
        skip(self, subject, cancel),
        fields(subject_id = %subject.id, template = %self.config.template)
    )]
    pub async fn notify_all_until(
        &self,
        subject: Arc<ContentItem>,
        cancel: watch::Receiver<bool>,
    ) -> Result<FanoutReport, FanoutError> {
        self.stats.runs.fetch_add(1, Ordering::Relaxed);

        let template = self
            .templates
            .get(&self.config.template)
            .ok_or_else(|| FanoutError::TemplateNotFound(self.config.template.clone()))?;

        // Persisting the canonical message happens before any dispatch starts
        let canonical = NotificationInstance::new(template, subject);
        if let Err(e) = self.messages.save(&canonical).await {
            self.stats.persist_failures.fetch_add(1, Ordering::Relaxed);
            FanoutMetrics::record_run("persist_failed");
            tracing::error!(
                message_id = %canonical.id(),
                error = %e,
                "Canonical message could not be persisted, nothing sent"
            );
            return Err(FanoutError::Persist(e));
        }
        self.stats.persisted.fetch_add(1, Ordering::Relaxed);
        FanoutMetrics::record_persisted();

        let recipients = match self.recipients.active_recipients().await {
            Ok(stream) => stream,
            Err(e) => {
                self.stats.recipient_failures.fetch_add(1, Ordering::Relaxed);
                FanoutMetrics::record_run("recipients_failed");
                tracing::error!(
                    message_id = %canonical.id(),
                    error = %e,
                    "Failed to open recipient stream"
                );
                return Err(FanoutError::Recipients(e));
            }
        };

        let concurrency = self.config.concurrency.max(1);
        let mut recipients = recipients.take_until(Box::pin(wait_cancelled(cancel)));
        let mut in_flight = FuturesUnordered::new();
        let mut report = FanoutReport::new(canonical.id());
        let mut fetch_error = None;

        while let Some(next) = recipients.next().await {
            let recipient = match next {
                Ok(recipient) => recipient,
                Err(e) => {
                    fetch_error = Some(e);
                    break;
                }
            };

            if !recipient.is_active() {
                tracing::debug!(recipient_id = %recipient.id, "Skipping inactive recipient");
                continue;
            }

            report.recipients += 1;
            self.stats.recipients.fetch_add(1, Ordering::Relaxed);
            FanoutMetrics::record_recipient();

            in_flight.push(self.spawn_dispatch(&canonical, recipient));

            // Wait for a slot when the pool is full
            while in_flight.len() >= concurrency {
                match in_flight.next().await {
                    Some(joined) => self.collect(&mut report, joined),
                    None => break,
                }
            }
        }

        while let Some(joined) = in_flight.next().await {
            self.collect(&mut report, joined);
        }

        if let Some(e) = fetch_error {
            self.stats.recipient_failures.fetch_add(1, Ordering::Relaxed);
            FanoutMetrics::record_run("recipients_failed");
            tracing::error!(
                message_id = %report.message_id,
                dispatched = report.dispatched,
                failed = report.failed,
                error = %e,
                "Recipient stream failed mid fan-out"
            );
            return Err(FanoutError::Recipients(e));
        }

        report.cancelled = recipients.is_stopped();
        if report.cancelled {
            self.stats.cancelled_runs.fetch_add(1, Ordering::Relaxed);
            FanoutMetrics::record_run("cancelled");
        } else {
            FanoutMetrics::record_run("completed");
        }

        tracing::info!(
            message_id = %report.message_id,
            recipients = report.recipients,
            dispatched = report.dispatched,
            failed = report.failed,
            timed_out = report.timed_out,
            cancelled = report.cancelled,
            "Fan-out finished"
        );

        Ok(report)
    }

    /// Duplicate the canonical message for `recipient` and send it on a
    /// separate task, so a panicking resolver or transport only loses this
    /// one recipient.
    fn spawn_dispatch(
        &self,
        canonical: &NotificationInstance,
        recipient: Recipient,
    ) -> JoinHandle<DispatchOutcome> {
        let message = canonical.with_owner(recipient);
        let options = SendOptions {
            correlation_id: Some(canonical.id().to_string()),
            ..SendOptions::default()
        };
        let notifier = self.notifier.clone();
        let channel = self.config.channel.clone();
        let timeout = Duration::from_millis(self.config.dispatch_timeout_ms);

        tokio::spawn(
            async move { dispatch(notifier, message, options, channel, timeout).await }
                .in_current_span(),
        )
    }

    fn collect(&self, report: &mut FanoutReport, joined: Result<DispatchOutcome, JoinError>) {
        let outcome = joined.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Dispatch task panicked");
            FanoutMetrics::record_failed(&self.config.channel);
            DispatchOutcome::Failed
        });
        report.record(outcome);
        self.stats.record_outcome(outcome);
    }
}

#[tracing::instrument(
    name = "fanout.dispatch",
    skip_all,
    fields(
        message_id = %message.id(),
        recipient_id = message.owner().map(|o| o.id.as_str()).unwrap_or_default(),
        channel = %channel
    )
)]
async fn dispatch(
    notifier: Arc<dyn Notifier>,
    message: NotificationInstance,
    options: SendOptions,
    channel: String,
    timeout: Duration,
) -> DispatchOutcome {
    let start = Instant::now();

    match tokio::time::timeout(timeout, notifier.send(&message, &options, &channel)).await {
        Ok(Ok(())) => {
            FanoutMetrics::record_sent(&channel, start.elapsed());
            tracing::debug!(notifier = notifier.name(), "Message dispatched");
            DispatchOutcome::Sent
        }
        Ok(Err(e)) => {
            FanoutMetrics::record_failed(&channel);
            tracing::warn!(error = %e, "Dispatch failed");
            DispatchOutcome::Failed
        }
        Err(_) => {
            FanoutMetrics::record_timeout(&channel);
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Dispatch timed out"
            );
            DispatchOutcome::TimedOut
        }
    }
}

/// Resolves once `cancel` holds `true`; never resolves if the sender is
/// dropped without cancelling.
async fn wait_cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::content::MemoryRecipientStore;
    use crate::message::{default_templates, CalcStrategy, MemoryMessageStore};
    use crate::notifier::NotifierError;

    /// Records each recipient it renders for and tracks peak concurrency
    #[derive(Default)]
    struct ProbeNotifier {
        delay: Duration,
        sent: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for ProbeNotifier {
        fn name(&self) -> &'static str {
            "probe"
        }

        async fn send(
            &self,
            message: &NotificationInstance,
            _options: &SendOptions,
            _channel: &str,
        ) -> Result<(), NotifierError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let rendered = message.render()?;
            assert!(rendered.body.contains("Hello"));
            if let Some(owner) = message.owner() {
                self.sent.lock().unwrap().push(owner.id.clone());
            }
            Ok(())
        }
    }

    fn config(concurrency: usize) -> FanoutConfig {
        FanoutConfig {
            concurrency,
            calc: CalcStrategy::Disabled,
            ..FanoutConfig::default()
        }
    }

    fn recipients(n: usize) -> Arc<MemoryRecipientStore> {
        let store = MemoryRecipientStore::new();
        for i in 0..n {
            store.insert(Recipient::new(format!("u{:03}", i), format!("User {}", i)));
        }
        Arc::new(store)
    }

    fn subject() -> Arc<ContentItem> {
        Arc::new(ContentItem::new("7", "Launch", "/news/launch", Utc::now()))
    }

    #[tokio::test]
    async fn test_every_recipient_gets_one_dispatch() {
        let notifier = Arc::new(ProbeNotifier::default());
        let messages = Arc::new(MemoryMessageStore::new());
        let service = NotificationFanoutService::new(
            default_templates(CalcStrategy::Disabled),
            messages.clone(),
            recipients(25),
            notifier.clone(),
            config(4),
        );

        let report = service.notify_all(subject()).await.unwrap();

        assert_eq!(report.recipients, 25);
        assert_eq!(report.dispatched, 25);
        assert!(!report.cancelled);

        let mut sent = notifier.sent.lock().unwrap().clone();
        sent.sort();
        sent.dedup();
        assert_eq!(sent.len(), 25);

        // Only the canonical message is persisted
        assert_eq!(messages.count().await.unwrap(), 1);
        assert!(messages.get(report.message_id).is_some());
    }

    #[tokio::test]
    async fn test_in_flight_dispatches_bounded() {
        let notifier = Arc::new(ProbeNotifier {
            delay: Duration::from_millis(20),
            ..ProbeNotifier::default()
        });
        let service = NotificationFanoutService::new(
            default_templates(CalcStrategy::Disabled),
            Arc::new(MemoryMessageStore::new()),
            recipients(20),
            notifier.clone(),
            config(3),
        );

        let report = service.notify_all(subject()).await.unwrap();

        assert_eq!(report.dispatched, 20);
        assert!(notifier.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_unknown_template_rejected() {
        let service = NotificationFanoutService::new(
            Arc::new(TemplateRegistry::new()),
            Arc::new(MemoryMessageStore::new()),
            recipients(2),
            Arc::new(ProbeNotifier::default()),
            config(2),
        );

        let result = service.notify_all(subject()).await;
        assert!(matches!(result, Err(FanoutError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_sends_nothing() {
        let notifier = Arc::new(ProbeNotifier::default());
        let messages = Arc::new(MemoryMessageStore::new());
        let service = NotificationFanoutService::new(
            default_templates(CalcStrategy::Disabled),
            messages.clone(),
            recipients(5),
            notifier.clone(),
            config(2),
        );

        let (_tx, rx) = watch::channel(true);
        let report = service.notify_all_until(subject(), rx).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.recipients, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
        // Canonical message is persisted before cancellation is observed
        assert_eq!(messages.count().await.unwrap(), 1);
        assert_eq!(service.stats().cancelled_runs, 1);
    }

    #[test]
    fn test_wait_cancelled_wakes_on_cancel() {
        let (tx, rx) = watch::channel(false);
        let mut waiting = tokio_test::task::spawn(wait_cancelled(rx));

        tokio_test::assert_pending!(waiting.poll());
        tx.send(true).unwrap();
        assert!(waiting.is_woken());
        tokio_test::assert_ready!(waiting.poll());
    }

    #[test]
    fn test_wait_cancelled_ignores_dropped_sender() {
        let (tx, rx) = watch::channel(false);
        let mut waiting = tokio_test::task::spawn(wait_cancelled(rx));

        tokio_test::assert_pending!(waiting.poll());
        drop(tx);
        tokio_test::assert_pending!(waiting.poll());
    }
}
