use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use storefront_core_types::{ArbitrationId, SubscriptionToken};
use tokio::sync::oneshot;
use tracing::debug;

use crate::ports::{EventSource, TransientEvent};

/// Exactly one of these is produced per arbitration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// The dialog appeared first; carries its message. The dialog has been dismissed.
    Captured(String),
    /// The deadline elapsed first.
    TimedOut,
}

impl ArbitrationOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, ArbitrationOutcome::Captured(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ArbitrationOutcome::Captured(message) => Some(message),
            ArbitrationOutcome::TimedOut => None,
        }
    }

    /// Captured message, or `fallback` when no dialog appeared.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message().unwrap_or(fallback).to_string()
    }
}

impl fmt::Display for ArbitrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitrationOutcome::Captured(message) => write!(f, "captured: {message}"),
            ArbitrationOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// `Armed` moves to exactly one of the terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbitrationState {
    Armed,
    Captured,
    TimedOut,
}

/// A listener armed before the action that may raise a dialog.
///
/// Consumed by `resolve`. Dropping it unresolved unsubscribes the listener.
pub struct PendingArbitration {
    pub(crate) id: ArbitrationId,
    pub(crate) source: Arc<dyn EventSource>,
    pub(crate) token: Option<SubscriptionToken>,
    pub(crate) receiver: oneshot::Receiver<Arc<dyn TransientEvent>>,
    pub(crate) armed_at: Instant,
    pub(crate) state: ArbitrationState,
}

impl PendingArbitration {
    pub fn id(&self) -> &ArbitrationId {
        &self.id
    }

    pub fn state(&self) -> ArbitrationState {
        self.state
    }

    pub fn armed_at(&self) -> Instant {
        self.armed_at
    }

    pub fn source(&self) -> String {
        self.source.describe()
    }

    pub(crate) fn settle(&mut self, to: ArbitrationState) {
        debug_assert_eq!(self.state, ArbitrationState::Armed);
        debug!(arbitration = %self.id, from = ?self.state, to = ?to, "arbitration settled");
        self.state = to;
    }

    /// The source already dropped a fired handler; forget the token.
    pub(crate) fn release(&mut self) {
        self.token = None;
    }

    /// Remove the listener and refuse any late delivery.
    ///
    /// Returns an event that landed in the slot after the race was decided
    /// but before the slot was closed; the caller must discard it.
    pub(crate) fn disarm(&mut self) -> Option<Arc<dyn TransientEvent>> {
        if let Some(token) = self.token.take() {
            self.source.unsubscribe(&token);
        }
        self.receiver.close();
        self.receiver.try_recv().ok()
    }
}

impl Drop for PendingArbitration {
    fn drop(&mut self) {
        if self.token.is_some() {
            debug!(arbitration = %self.id, "pending arbitration dropped unresolved; disarming");
            if let Some(event) = self.disarm() {
                debug!(arbitration = %self.id, message = %event.message(), "discarding undelivered dialog");
            }
        }
    }
}

impl fmt::Debug for PendingArbitration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingArbitration")
            .field("id", &self.id)
            .field("source", &self.source.describe())
            .field("token", &self.token)
            .field("state", &self.state)
            .finish()
    }
}
