//! Element stabilization for dynamic storefront pages
//!
//! Waits until the population of elements matched by a live query satisfies a
//! cardinality contract (explicit bounds, or "stopped changing"), then until
//! every matched element is visible, and hands back the resolved snapshot.

pub mod api;
pub mod errors;
pub mod memory;
pub mod model;
pub mod policy;
pub mod ports;
pub mod text;

mod runner;

pub use api::{ElementStabilizer, StabilizerBuilder};
pub use errors::{ContractError, ElementWaitError, PolicyError, WaitCause};
pub use model::{CardinalityContract, ElementState, StabilizationResult, StateWait};
pub use policy::StabilizerPolicy;
pub use ports::{ElementHandle, LiveQuery};
pub use text::{collect_texts, wait_for_texts};
