use thiserror::Error;

use storefront_core_types::HarnessError;

/// Timing out is an outcome, not an error; only a source that cannot be
/// subscribed to fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArbiterError {
    #[error("cannot arm dialog listener on {target}: {reason}")]
    Arm {
        target: String,
        #[source]
        reason: HarnessError,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

impl From<ArbiterError> for HarnessError {
    fn from(err: ArbiterError) -> Self {
        match err {
            ArbiterError::Arm { reason, .. } => reason,
        }
    }
}
