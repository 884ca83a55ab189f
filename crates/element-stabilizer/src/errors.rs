//! Error types for element waits

use thiserror::Error;

use storefront_core_types::HarnessError;

use crate::model::CardinalityContract;

/// Rejected cardinality contract construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("minimum count {min} exceeds maximum count {max}")]
    MinExceedsMax { min: usize, max: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Why an element wait gave up.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WaitCause {
    /// Nothing matched the query before the timeout.
    #[error("no element attached before the timeout")]
    NoAttachment,

    /// Elements attached but their count never entered the contract's range.
    #[error("element count never satisfied {contract} (last count {found})")]
    CardinalityTimeout {
        contract: CardinalityContract,
        found: usize,
    },

    /// The count kept changing until the timeout.
    #[error("element count did not stabilize (last count {})", count_label(.found))]
    StabilizationTimeout { found: Option<usize> },

    /// The snapshot resolved but not every element became visible in its budget.
    #[error(
        "{expected} elements resolved but not all became visible (currently {})",
        count_label(.found)
    )]
    VisibilityTimeout {
        expected: usize,
        found: Option<usize>,
    },

    /// The elements resolved but some never carried text.
    #[error("only {populated} of {expected} elements carried text")]
    TextTimeout { expected: usize, populated: usize },

    #[error(transparent)]
    Driver(#[from] HarnessError),
}

impl WaitCause {
    pub fn is_timeout(&self) -> bool {
        !matches!(self, WaitCause::Driver(_))
    }
}

/// Failed element wait, with the expected contract and the count found when it failed.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "failed to wait for elements '{query}': expected {expected}, found {}: {cause}",
    count_label(.found)
)]
pub struct ElementWaitError {
    pub query: String,
    pub expected: CardinalityContract,
    pub found: Option<usize>,
    #[source]
    pub cause: WaitCause,
}

impl ElementWaitError {
    pub fn new(
        query: impl Into<String>,
        expected: CardinalityContract,
        found: Option<usize>,
        cause: WaitCause,
    ) -> Self {
        Self {
            query: query.into(),
            expected,
            found,
            cause,
        }
    }

    pub fn cause(&self) -> &WaitCause {
        &self.cause
    }

    pub fn is_timeout(&self) -> bool {
        self.cause.is_timeout()
    }
}

impl From<ElementWaitError> for HarnessError {
    fn from(err: ElementWaitError) -> Self {
        match err.cause {
            WaitCause::Driver(inner) => inner,
            _ => HarnessError::Driver(err.to_string()),
        }
    }
}

fn count_label(found: &Option<usize>) -> String {
    match found {
        Some(count) => count.to_string(),
        None => "unknown".to_string(),
    }
}
