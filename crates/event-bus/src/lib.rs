use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use storefront_core_types::HarnessError;

mod events;
mod observer;

pub use events::SyncEvent;
pub use observer::{CompositeObserver, NullObserver, SyncObserver, TracingObserver, Verbosity};

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), HarnessError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus suitable for unit tests and the scenario simulator.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), HarnessError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|err| HarnessError::closed(err.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// The bus doubles as an observer; events with no subscriber are dropped.
impl SyncObserver for InMemoryBus<SyncEvent> {
    fn observe(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}
