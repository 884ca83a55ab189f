use std::sync::Arc;

use async_trait::async_trait;
use storefront_core_types::{HarnessError, SubscriptionToken};

/// A dialog (or similar one-time UI event) that has surfaced on the page.
#[async_trait]
pub trait TransientEvent: Send + Sync {
    fn message(&self) -> String;
    /// Dismiss the dialog so the page can continue.
    async fn acknowledge(&self) -> Result<(), HarnessError>;
}

/// Invoked at most once with the next event after subscription.
pub type EventHandler = Box<dyn FnOnce(Arc<dyn TransientEvent>) + Send>;

#[async_trait]
pub trait EventSource: Send + Sync {
    fn describe(&self) -> String;

    /// Register `handler` for the next event only; the source drops it after it fires.
    async fn subscribe_once(&self, handler: EventHandler)
        -> Result<SubscriptionToken, HarnessError>;

    /// Remove a handler that has not fired. Unknown tokens are ignored.
    fn unsubscribe(&self, token: &SubscriptionToken);
}
