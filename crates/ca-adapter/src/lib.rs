//! ca-adapter: generic co-simulation adapters around domain models.
//!
//! Contains:
//! - model (attribute access, stepping and construction traits)
//! - protocol (driver payloads and the `Simulator` trait)
//! - flat (one model kind, one model per entity)
//! - hierarchical (controller entities with fan-out channels)
//! - topology (driver back-channel and system/channel resolution)
//! - routing, lifecycle, params, error

mod access;
pub mod error;
pub mod flat;
pub mod hierarchical;
pub mod lifecycle;
pub mod model;
pub mod params;
pub mod protocol;
pub mod routing;
pub mod topology;

pub use ca_core::AttrValue;
pub use error::{AdapterError, AdapterResult, ErrorKind};
pub use flat::FlatAdapter;
pub use hierarchical::{CHANNEL_COUNT_PARAM, HierarchicalAdapter};
pub use lifecycle::Phase;
pub use model::{
    AttrField, AttributeAccess, ControllerModel, DomainModel, FromParams, ModelError, ModelResult,
};
pub use params::ModelParams;
pub use protocol::{EntityDescriptor, Inputs, OutputData, OutputRequest, Simulator, next_time};
pub use topology::{
    DriverClient, DriverError, DriverFuture, RelatedEntities, RelatedEntity, StaticTopology,
    SystemChannelMap,
};
