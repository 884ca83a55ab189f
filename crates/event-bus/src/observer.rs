//! Observer capability injected into the stabilizer and the arbiter.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::SyncEvent;

pub trait SyncObserver: Send + Sync {
    fn observe(&self, event: SyncEvent);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn observe(&self, _event: SyncEvent) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Failures and timeouts only.
    Quiet,
    #[default]
    Normal,
    /// Includes every count sample.
    Verbose,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "verbose" => Ok(Verbosity::Verbose),
            other => Err(format!("unknown verbosity '{other}'")),
        }
    }
}

/// Forwards events to `tracing`; the subscriber decides the sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver {
    verbosity: Verbosity,
}

impl TracingObserver {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn admits(&self, event: &SyncEvent) -> bool {
        match self.verbosity {
            Verbosity::Quiet => event.is_alert(),
            Verbosity::Normal => !event.is_progress(),
            Verbosity::Verbose => true,
        }
    }
}

impl SyncObserver for TracingObserver {
    fn observe(&self, event: SyncEvent) {
        if !self.admits(&event) {
            return;
        }
        match &event {
            SyncEvent::WaitStarted {
                wait,
                query,
                expected,
                timeout_ms,
            } => info!(%wait, %query, %expected, timeout_ms, "Waiting for elements"),
            SyncEvent::Attached { wait, elapsed_ms } => {
                debug!(%wait, elapsed_ms, "First match attached")
            }
            SyncEvent::CountSampled { wait, count } => debug!(%wait, count, "Sampled element count"),
            SyncEvent::CardinalitySettled {
                wait,
                count,
                samples,
            } => debug!(%wait, count, samples, "Element count settled"),
            SyncEvent::WaitCompleted {
                wait,
                count,
                elapsed_ms,
            } => info!(%wait, count, elapsed_ms, "Elements ready"),
            SyncEvent::WaitFailed {
                wait,
                reason,
                elapsed_ms,
            } => warn!(%wait, %reason, elapsed_ms, "Element wait failed"),
            SyncEvent::ArbitrationArmed {
                arbitration,
                source,
            } => info!(%arbitration, %source, "Dialog listener armed"),
            SyncEvent::DialogCaptured {
                arbitration,
                message,
                latency_ms,
            } => info!(%arbitration, %message, latency_ms, "Dialog captured"),
            SyncEvent::ArbitrationTimedOut {
                arbitration,
                deadline_ms,
            } => warn!(%arbitration, deadline_ms, "No dialog before deadline"),
            SyncEvent::LateEventDiscarded { arbitration } => {
                debug!(%arbitration, "Late dialog ignored after timeout")
            }
        }
    }
}

/// Fans each event out to several observers.
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn SyncObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl SyncObserver for CompositeObserver {
    fn observe(&self, event: SyncEvent) {
        for observer in &self.observers {
            observer.observe(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use storefront_core_types::{ArbitrationId, WaitId};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<SyncEvent>>);

    impl SyncObserver for Recorder {
        fn observe(&self, event: SyncEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn sampled() -> SyncEvent {
        SyncEvent::CountSampled {
            wait: WaitId("w".into()),
            count: 1,
        }
    }

    fn timed_out() -> SyncEvent {
        SyncEvent::ArbitrationTimedOut {
            arbitration: ArbitrationId("a".into()),
            deadline_ms: 10_000,
        }
    }

    fn captured() -> SyncEvent {
        SyncEvent::DialogCaptured {
            arbitration: ArbitrationId("a".into()),
            message: "ok".into(),
            latency_ms: 1,
        }
    }

    #[test]
    fn verbosity_filters() {
        let quiet = TracingObserver::new(Verbosity::Quiet);
        assert!(quiet.admits(&timed_out()));
        assert!(!quiet.admits(&captured()));

        let normal = TracingObserver::new(Verbosity::Normal);
        assert!(normal.admits(&captured()));
        assert!(!normal.admits(&sampled()));

        let verbose = TracingObserver::new(Verbosity::Verbose);
        assert!(verbose.admits(&sampled()));
    }

    #[test]
    fn verbosity_parses() {
        assert_eq!("Verbose".parse::<Verbosity>(), Ok(Verbosity::Verbose));
        assert!("loud".parse::<Verbosity>().is_err());
    }

    #[test]
    fn composite_fans_out() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let composite = CompositeObserver::new()
            .with(first.clone())
            .with(second.clone());
        assert_eq!(composite.len(), 2);

        composite.observe(sampled());
        assert_eq!(first.0.lock().unwrap().len(), 1);
        assert_eq!(second.0.lock().unwrap().len(), 1);
    }
}
