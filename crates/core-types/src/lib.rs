use std::fmt;

use thiserror::Error;
use uuid::Uuid;

mod clock;

pub use clock::{Clock, TokioClock};

/// Failure reported by a browser-driver capability (query, element, event source).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// The driver could not complete the request.
    #[error("driver error: {0}")]
    Driver(String),

    /// The element was detached from the page while it was being used.
    #[error("element detached: {0}")]
    Detached(String),

    /// The page or event source is closed and can no longer be used.
    #[error("closed: {0}")]
    Closed(String),
}

impl HarnessError {
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::Closed(message.into())
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct WaitId(pub String);

impl WaitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for WaitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WaitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ArbitrationId(pub String);

impl ArbitrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ArbitrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArbitrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token returned by an event source when a handler is registered.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionToken(pub u64);

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
