//! ca-core: shared foundation for the co-simulation adapters.
//!
//! Contains:
//! - ids (entity, source, system and driver-wide identifiers)
//! - value (attribute values exchanged with the driver)
//! - numeric (Real + tolerances + float guards)
//! - units (uom SI helpers used by the domain models)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;
pub mod value;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use value::AttrValue;

/// Simulation time in driver ticks. With a time resolution of 1 a tick is one second.
pub type SimTime = u64;
