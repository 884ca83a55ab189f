use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ContractError;
use crate::ports::ElementHandle;

/// Acceptable element count before a list is read.
///
/// With neither bound set the contract means "wait until the count stops
/// changing" rather than a fixed range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CardinalityContract {
    min: Option<usize>,
    max: Option<usize>,
}

impl CardinalityContract {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Result<Self, ContractError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ContractError::MinExceedsMax { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// Wait for the count to settle.
    pub const fn stable() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub const fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub const fn exactly(count: usize) -> Self {
        Self {
            min: Some(count),
            max: Some(count),
        }
    }

    pub fn between(min: usize, max: usize) -> Result<Self, ContractError> {
        Self::new(Some(min), Some(max))
    }

    pub fn min(&self) -> Option<usize> {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn is_stabilize(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn admits(&self, count: usize) -> bool {
        self.min.map_or(true, |min| count >= min) && self.max.map_or(true, |max| count <= max)
    }

    /// Whether an empty page is an acceptable terminal state.
    pub fn accepts_empty(&self) -> bool {
        self.min.unwrap_or(0) == 0
    }
}

impl fmt::Display for CardinalityContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (None, None) => f.write_str("stable count"),
            (Some(min), Some(max)) if min == max => write!(f, "exactly {min}"),
            (Some(min), Some(max)) => write!(f, "between {min} and {max}"),
            (Some(min), None) => write!(f, "at least {min}"),
            (None, Some(max)) => write!(f, "at most {max}"),
        }
    }
}

/// Readiness predicate an element can be awaited for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementState {
    Attached,
    Visible,
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementState::Attached => f.write_str("attached"),
            ElementState::Visible => f.write_str("visible"),
        }
    }
}

/// Result of awaiting an element state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateWait {
    Reached,
    TimedOut,
}

/// Snapshot of matched elements that passed the readiness check at return time.
///
/// The page keeps changing afterwards; nothing here is kept live.
#[derive(Clone)]
pub struct StabilizationResult {
    elements: Vec<Arc<dyn ElementHandle>>,
    elapsed: Duration,
    samples: u32,
}

impl StabilizationResult {
    pub(crate) fn new(elements: Vec<Arc<dyn ElementHandle>>, elapsed: Duration, samples: u32) -> Self {
        Self {
            elements,
            elapsed,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Arc<dyn ElementHandle>] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Arc<dyn ElementHandle>> {
        self.elements
    }

    /// Time spent inside the wait.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of count evaluations taken while settling.
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl fmt::Debug for StabilizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StabilizationResult")
            .field("len", &self.elements.len())
            .field("elapsed", &self.elapsed)
            .field("samples", &self.samples)
            .finish()
    }
}
