//! Dialog arbitration
//!
//! Arms a one-shot listener before an action that may raise a native dialog,
//! then races the dialog against a deadline. Exactly one outcome is produced,
//! and the listener never outlives the arbitration.

pub mod api;
pub mod errors;
pub mod memory;
pub mod model;
pub mod policy;
pub mod ports;

pub use api::{ArbiterBuilder, TransientEventArbiter};
pub use errors::{ArbiterError, PolicyError};
pub use model::{ArbitrationOutcome, ArbitrationState, PendingArbitration};
pub use policy::ArbiterPolicy;
pub use ports::{EventHandler, EventSource, TransientEvent};
