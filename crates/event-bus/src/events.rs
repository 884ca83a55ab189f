use serde::{Deserialize, Serialize};

use storefront_core_types::{ArbitrationId, WaitId};

/// Observable milestones of element waits and dialog arbitrations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncEvent {
    WaitStarted {
        wait: WaitId,
        query: String,
        expected: String,
        timeout_ms: u64,
    },
    Attached {
        wait: WaitId,
        elapsed_ms: u64,
    },
    CountSampled {
        wait: WaitId,
        count: usize,
    },
    CardinalitySettled {
        wait: WaitId,
        count: usize,
        samples: u32,
    },
    WaitCompleted {
        wait: WaitId,
        count: usize,
        elapsed_ms: u64,
    },
    WaitFailed {
        wait: WaitId,
        reason: String,
        elapsed_ms: u64,
    },
    ArbitrationArmed {
        arbitration: ArbitrationId,
        source: String,
    },
    DialogCaptured {
        arbitration: ArbitrationId,
        message: String,
        latency_ms: u64,
    },
    ArbitrationTimedOut {
        arbitration: ArbitrationId,
        deadline_ms: u64,
    },
    LateEventDiscarded {
        arbitration: ArbitrationId,
    },
}

impl SyncEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::WaitStarted { .. } => "wait_started",
            SyncEvent::Attached { .. } => "attached",
            SyncEvent::CountSampled { .. } => "count_sampled",
            SyncEvent::CardinalitySettled { .. } => "cardinality_settled",
            SyncEvent::WaitCompleted { .. } => "wait_completed",
            SyncEvent::WaitFailed { .. } => "wait_failed",
            SyncEvent::ArbitrationArmed { .. } => "arbitration_armed",
            SyncEvent::DialogCaptured { .. } => "dialog_captured",
            SyncEvent::ArbitrationTimedOut { .. } => "arbitration_timed_out",
            SyncEvent::LateEventDiscarded { .. } => "late_event_discarded",
        }
    }

    /// Failures and timeouts; these survive the quiet verbosity.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            SyncEvent::WaitFailed { .. } | SyncEvent::ArbitrationTimedOut { .. }
        )
    }

    /// Fine-grained progress only shown at verbose level.
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            SyncEvent::Attached { .. }
                | SyncEvent::CountSampled { .. }
                | SyncEvent::CardinalitySettled { .. }
                | SyncEvent::LateEventDiscarded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let event = SyncEvent::DialogCaptured {
            arbitration: ArbitrationId("arb-1".into()),
            message: "Product added".into(),
            latency_ms: 12,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "dialog_captured");
        assert_eq!(json["message"], "Product added");
        assert_eq!(event.kind(), "dialog_captured");
    }

    #[test]
    fn classification() {
        let failed = SyncEvent::WaitFailed {
            wait: WaitId("w".into()),
            reason: "no attachment".into(),
            elapsed_ms: 2000,
        };
        assert!(failed.is_alert());
        assert!(!failed.is_progress());

        let sampled = SyncEvent::CountSampled {
            wait: WaitId("w".into()),
            count: 2,
        };
        assert!(sampled.is_progress());
        assert!(!sampled.is_alert());
    }
}
