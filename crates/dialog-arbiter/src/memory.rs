//! In-memory dialog source for tests and the scenario simulator.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use storefront_core_types::{HarnessError, SubscriptionToken};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ports::{EventHandler, EventSource, TransientEvent};

/// Page stand-in that raises dialogs on demand.
pub struct MemoryDialogSource {
    name: String,
    closed: bool,
    sticky: bool,
    next_token: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionToken, EventHandler)>>,
    acknowledged: Arc<AtomicUsize>,
    unhandled: AtomicUsize,
}

impl MemoryDialogSource {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), false, false))
    }

    /// A source that refuses every subscription.
    pub fn closed(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), true, false))
    }

    /// A source that keeps handlers registered even after `unsubscribe`,
    /// mimicking a driver that races removal against delivery.
    pub fn sticky(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), false, true))
    }

    fn build(name: String, closed: bool, sticky: bool) -> Self {
        Self {
            name,
            closed,
            sticky,
            next_token: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
            acknowledged: Arc::new(AtomicUsize::new(0)),
            unhandled: AtomicUsize::new(0),
        }
    }

    /// Raise a dialog now. Returns how many listeners received it.
    pub fn fire(&self, message: impl Into<String>) -> usize {
        let message = message.into();
        let handlers: Vec<_> = self.handlers.lock().drain(..).collect();
        if handlers.is_empty() {
            debug!(source = %self.name, %message, "dialog with no listener auto-dismissed");
            self.unhandled.fetch_add(1, Ordering::SeqCst);
            return 0;
        }

        let delivered = handlers.len();
        for (_, handler) in handlers {
            handler(Arc::new(MemoryDialog {
                message: message.clone(),
                acknowledged: Arc::clone(&self.acknowledged),
                handled: Mutex::new(false),
            }));
        }
        delivered
    }

    /// Raise a dialog after `delay` on the tokio clock.
    pub fn fire_after(self: &Arc<Self>, delay: Duration, message: impl Into<String>) -> JoinHandle<usize> {
        let source = Arc::clone(self);
        let message = message.into();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            source.fire(message)
        })
    }

    /// Drop every registered handler without delivering anything.
    pub fn drop_handlers(&self) {
        self.handlers.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Dialogs dismissed by a listener.
    pub fn acknowledged(&self) -> usize {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Dialogs raised while nobody was listening.
    pub fn unhandled(&self) -> usize {
        self.unhandled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MemoryDialogSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn subscribe_once(
        &self,
        handler: EventHandler,
    ) -> Result<SubscriptionToken, HarnessError> {
        if self.closed {
            return Err(HarnessError::closed(format!("{} is closed", self.name)));
        }
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.handlers.lock().push((token.clone(), handler));
        Ok(token)
    }

    fn unsubscribe(&self, token: &SubscriptionToken) {
        if self.sticky {
            return;
        }
        self.handlers.lock().retain(|(registered, _)| registered != token);
    }
}

struct MemoryDialog {
    message: String,
    acknowledged: Arc<AtomicUsize>,
    handled: Mutex<bool>,
}

#[async_trait]
impl TransientEvent for MemoryDialog {
    fn message(&self) -> String {
        self.message.clone()
    }

    async fn acknowledge(&self) -> Result<(), HarnessError> {
        let mut handled = self.handled.lock();
        if *handled {
            return Err(HarnessError::driver("dialog already handled"));
        }
        *handled = true;
        self.acknowledged.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn fire_delivers_once_then_forgets_handler() {
        let source = MemoryDialogSource::new("page");
        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);
        source
            .subscribe_once(Box::new(move |_: Arc<dyn TransientEvent>| flag.store(true, Ordering::SeqCst)))
            .await
            .unwrap();

        assert_eq!(source.fire("hello"), 1);
        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(source.fire("again"), 0);
        assert_eq!(source.unhandled(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_matching_token() {
        let source = MemoryDialogSource::new("page");
        let first = source.subscribe_once(Box::new(|_: Arc<dyn TransientEvent>| {})).await.unwrap();
        let _second = source.subscribe_once(Box::new(|_: Arc<dyn TransientEvent>| {})).await.unwrap();
        source.unsubscribe(&first);
        assert_eq!(source.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn dialogs_can_only_be_dismissed_once() {
        let dialog = MemoryDialog {
            message: "Wrong password.".into(),
            acknowledged: Arc::new(AtomicUsize::new(0)),
            handled: Mutex::new(false),
        };
        assert!(dialog.acknowledge().await.is_ok());
        assert!(dialog.acknowledge().await.is_err());
        assert_eq!(dialog.acknowledged.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_source_rejects_subscriptions() {
        let source = MemoryDialogSource::closed("page");
        let err = source.subscribe_once(Box::new(|_: Arc<dyn TransientEvent>| {})).await.unwrap_err();
        assert!(matches!(err, HarnessError::Closed(_)));
    }
}
