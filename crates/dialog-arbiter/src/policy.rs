use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterPolicy {
    /// How long to wait for the dialog after the action.
    pub deadline_ms: u64,
    /// Pause after a timeout before the fallback runs.
    pub grace_ms: u64,
}

impl ArbiterPolicy {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.deadline_ms == 0 {
            return Err(PolicyError::ZeroDuration("deadline_ms"));
        }
        Ok(())
    }
}

impl Default for ArbiterPolicy {
    fn default() -> Self {
        Self {
            deadline_ms: 10_000,
            grace_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = ArbiterPolicy::default();
        assert_eq!(policy.deadline(), Duration::from_secs(10));
        assert_eq!(policy.grace(), Duration::from_secs(1));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn zero_deadline_is_invalid() {
        let policy = ArbiterPolicy {
            deadline_ms: 0,
            ..ArbiterPolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::ZeroDuration("deadline_ms"))
        );
        assert_eq!(
            policy.validate().unwrap_err().to_string(),
            "deadline_ms must be greater than zero"
        );
    }
}
