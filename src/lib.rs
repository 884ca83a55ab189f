//! Storefront harness library
//!
//! Element stabilization and dialog arbitration for page objects, plus the
//! configuration and lifecycle plumbing the CLI is built on.

pub mod config;
pub mod lifecycle;
pub mod scenarios;

// Re-export commonly used types for external use
pub use config::{load_config, ConfigError, ConfigLocator, HarnessConfig, LoadedConfig};
pub use dialog_arbiter::{
    ArbiterBuilder, ArbiterError, ArbiterPolicy, ArbitrationOutcome, EventSource, TransientEvent,
    TransientEventArbiter,
};
pub use element_stabilizer::{
    collect_texts, wait_for_texts, CardinalityContract, ElementHandle, ElementStabilizer,
    ElementWaitError, LiveQuery, StabilizationResult, StabilizerBuilder, StabilizerPolicy,
    WaitCause,
};
pub use lifecycle::{TestLifecycle, TestStatus};
pub use scenarios::{Scenario, ScenarioReport, ScenarioRunner, ScenarioSelection};
pub use storefront_core_types::{Clock, HarnessError, TokioClock};
pub use storefront_event_bus::{SyncEvent, SyncObserver, TracingObserver, Verbosity};
