use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storefront_core_types::{ArbitrationId, Clock, TokioClock};
use storefront_event_bus::{NullObserver, SyncEvent, SyncObserver};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::errors::ArbiterError;
use crate::model::{ArbitrationOutcome, ArbitrationState, PendingArbitration};
use crate::policy::ArbiterPolicy;
use crate::ports::{EventHandler, EventSource, TransientEvent};

pub struct ArbiterBuilder {
    policy: ArbiterPolicy,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn SyncObserver>>,
}

impl ArbiterBuilder {
    pub fn new(policy: ArbiterPolicy) -> Self {
        Self {
            policy,
            clock: None,
            observer: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> TransientEventArbiter {
        TransientEventArbiter {
            policy: self.policy,
            clock: self.clock.unwrap_or_else(|| Arc::new(TokioClock)),
            observer: self.observer.unwrap_or_else(|| Arc::new(NullObserver)),
        }
    }
}

impl Default for ArbiterBuilder {
    fn default() -> Self {
        Self::new(ArbiterPolicy::default())
    }
}

enum Race {
    Fired(Arc<dyn TransientEvent>),
    Abandoned,
    Deadline,
}

#[derive(Clone)]
pub struct TransientEventArbiter {
    policy: ArbiterPolicy,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn SyncObserver>,
}

impl TransientEventArbiter {
    pub fn policy(&self) -> &ArbiterPolicy {
        &self.policy
    }

    /// Subscribe for the next dialog on `source`. Call before the triggering action.
    pub async fn arm(&self, source: Arc<dyn EventSource>) -> Result<PendingArbitration, ArbiterError> {
        let id = ArbitrationId::new();
        let (sender, receiver) = oneshot::channel::<Arc<dyn TransientEvent>>();

        let observer = Arc::clone(&self.observer);
        let handler_id = id.clone();
        let handler: EventHandler = Box::new(move |event: Arc<dyn TransientEvent>| {
            if sender.send(event).is_err() {
                debug!(arbitration = %handler_id, "dialog arrived after arbitration settled");
                observer.observe(SyncEvent::LateEventDiscarded {
                    arbitration: handler_id,
                });
            }
        });

        let token = source
            .subscribe_once(handler)
            .await
            .map_err(|reason| ArbiterError::Arm {
                target: source.describe(),
                reason,
            })?;

        info!(arbitration = %id, source = %source.describe(), "Setting up dialog listener");
        self.observer.observe(SyncEvent::ArbitrationArmed {
            arbitration: id.clone(),
            source: source.describe(),
        });

        Ok(PendingArbitration {
            id,
            source,
            token: Some(token),
            receiver,
            armed_at: self.clock.now(),
            state: ArbitrationState::Armed,
        })
    }

    /// Race the armed listener against `deadline`.
    ///
    /// A captured dialog is dismissed before returning. On timeout the listener
    /// is removed, the grace pause elapses, then `on_timeout` runs once.
    #[instrument(skip_all, fields(arbitration = %pending.id, deadline_ms = deadline.as_millis() as u64))]
    pub async fn resolve<F>(
        &self,
        mut pending: PendingArbitration,
        deadline: Duration,
        on_timeout: F,
    ) -> ArbitrationOutcome
    where
        F: FnOnce() + Send,
    {
        let mut timer = self.clock.sleep(deadline);
        let race = tokio::select! {
            biased;
            fired = &mut pending.receiver => match fired {
                Ok(event) => Race::Fired(event),
                Err(_) => Race::Abandoned,
            },
            _ = &mut timer => Race::Deadline,
        };

        let event = match race {
            Race::Fired(event) => Some(event),
            Race::Abandoned => {
                debug!("event source dropped the listener; waiting out the deadline");
                timer.await;
                None
            }
            Race::Deadline => None,
        };

        match event {
            Some(event) => self.capture(pending, event).await,
            None => self.time_out(pending, deadline, on_timeout).await,
        }
    }

    /// `resolve` with the policy deadline.
    pub async fn resolve_default<F>(&self, pending: PendingArbitration, on_timeout: F) -> ArbitrationOutcome
    where
        F: FnOnce() + Send,
    {
        let deadline = self.policy.deadline();
        self.resolve(pending, deadline, on_timeout).await
    }

    /// Arm on `source`, run `action`, then resolve with the policy deadline.
    ///
    /// When the action fails the listener is disarmed and the error returned.
    pub async fn guard<T, E, Fut>(
        &self,
        source: Arc<dyn EventSource>,
        action: Fut,
    ) -> Result<(T, ArbitrationOutcome), E>
    where
        Fut: Future<Output = Result<T, E>> + Send,
        E: From<ArbiterError>,
    {
        let pending = self.arm(source).await?;
        let value = action.await?;
        let outcome = self.resolve_default(pending, || {}).await;
        Ok((value, outcome))
    }

    async fn capture(
        &self,
        mut pending: PendingArbitration,
        event: Arc<dyn TransientEvent>,
    ) -> ArbitrationOutcome {
        pending.release();
        pending.settle(ArbitrationState::Captured);

        let message = event.message();
        info!(%message, "Alert text found");
        if let Err(err) = event.acknowledge().await {
            warn!(%message, "failed to dismiss dialog: {}", err);
        }

        self.observer.observe(SyncEvent::DialogCaptured {
            arbitration: pending.id.clone(),
            message: message.clone(),
            latency_ms: self.clock.since(pending.armed_at).as_millis() as u64,
        });
        ArbitrationOutcome::Captured(message)
    }

    async fn time_out<F>(
        &self,
        mut pending: PendingArbitration,
        deadline: Duration,
        on_timeout: F,
    ) -> ArbitrationOutcome
    where
        F: FnOnce() + Send,
    {
        if let Some(stranded) = pending.disarm() {
            debug!(
                arbitration = %pending.id,
                message = %stranded.message(),
                "dialog arrived while the deadline was being handled; discarding"
            );
            self.observer.observe(SyncEvent::LateEventDiscarded {
                arbitration: pending.id.clone(),
            });
        }
        pending.settle(ArbitrationState::TimedOut);
        self.observer.observe(SyncEvent::ArbitrationTimedOut {
            arbitration: pending.id.clone(),
            deadline_ms: deadline.as_millis() as u64,
        });

        self.clock.sleep(self.policy.grace()).await;
        info!(deadline_ms = deadline.as_millis() as u64, "No alert found");
        on_timeout();
        ArbitrationOutcome::TimedOut
    }
}
