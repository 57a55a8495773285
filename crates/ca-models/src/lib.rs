//! ca-models: district heating domain models wrapped in co-simulation adapters.
//!
//! Contains:
//! - heat_pump, building, data_center (flat physics models)
//! - pv_system, temperature (CSV replay models) + timeseries
//! - dh_network (controller model with one heat exchanger channel per consumer)
//!
//! Every model module exposes `schema()` and `adapter()`.

mod common;
pub mod building;
pub mod data_center;
pub mod dh_network;
pub mod heat_pump;
pub mod pv_system;
pub mod temperature;
pub mod timeseries;

pub use building::Building;
pub use data_center::DataCenter;
pub use dh_network::{Consumer, DhNetwork, NetworkDefinition};
pub use heat_pump::HeatPump;
pub use pv_system::PvSystem;
pub use temperature::Temperature;
pub use timeseries::CsvTimeseries;
