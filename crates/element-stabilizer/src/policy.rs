use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

/// Timing policy for element waits. All values are milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerPolicy {
    /// Timeout used by `wait_default`.
    pub default_timeout_ms: u64,
    /// Interval between count samples when waiting for the count to settle.
    pub stable_poll_interval_ms: u64,
    /// Interval between count samples when waiting for explicit bounds.
    pub bound_poll_interval_ms: u64,
    /// Floor for each element's visibility budget.
    pub min_visibility_budget_ms: u64,
}

impl StabilizerPolicy {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn stable_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stable_poll_interval_ms)
    }

    pub fn bound_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bound_poll_interval_ms)
    }

    pub fn min_visibility_budget(&self) -> Duration {
        Duration::from_millis(self.min_visibility_budget_ms)
    }

    /// Visibility budget once `elapsed` of `timeout` has been spent.
    pub fn visibility_budget(&self, timeout: Duration, elapsed: Duration) -> Duration {
        timeout
            .saturating_sub(elapsed)
            .max(self.min_visibility_budget())
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.stable_poll_interval_ms == 0 {
            return Err(PolicyError::ZeroDuration("stable_poll_interval_ms"));
        }
        if self.bound_poll_interval_ms == 0 {
            return Err(PolicyError::ZeroDuration("bound_poll_interval_ms"));
        }
        if self.default_timeout_ms == 0 {
            return Err(PolicyError::ZeroDuration("default_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for StabilizerPolicy {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            stable_poll_interval_ms: 1_000,
            bound_poll_interval_ms: 100,
            min_visibility_budget_ms: 1_000,
        }
    }
}
