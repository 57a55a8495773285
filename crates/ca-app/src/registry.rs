//! Built-in adapters, addressable by name.

use ca_adapter::{AdapterResult, Simulator};
use ca_models::{building, data_center, dh_network, heat_pump, pv_system, temperature};
use ca_schema::AdapterSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const ADAPTERS: &[AdapterInfo] = &[
    AdapterInfo {
        name: "heat_pump",
        description: "Modulating heat pump (flat)",
    },
    AdapterInfo {
        name: "building",
        description: "Building with heat storage tank (flat)",
    },
    AdapterInfo {
        name: "data_center",
        description: "Data center with cooling and PV self-supply (flat)",
    },
    AdapterInfo {
        name: "pv_system",
        description: "PV profile replay from CSV (flat)",
    },
    AdapterInfo {
        name: "temperature",
        description: "Outdoor temperature replay from CSV (flat)",
    },
    AdapterInfo {
        name: "dh_network",
        description: "District heating network with heat exchanger channels (hierarchical)",
    },
];

pub fn list_adapters() -> &'static [AdapterInfo] {
    ADAPTERS
}

fn boxed<S: Simulator + 'static>(adapter: AdapterResult<S>) -> AppResult<Box<dyn Simulator>> {
    Ok(Box::new(adapter?))
}

/// Build a fresh, uninitialized adapter.
pub fn build_adapter(name: &str) -> AppResult<Box<dyn Simulator>> {
    match name {
        "heat_pump" => boxed(heat_pump::adapter()),
        "building" => boxed(building::adapter()),
        "data_center" => boxed(data_center::adapter()),
        "pv_system" => boxed(pv_system::adapter()),
        "temperature" => boxed(temperature::adapter()),
        "dh_network" => boxed(dh_network::adapter()),
        _ => Err(AppError::UnknownAdapter {
            name: name.to_string(),
            available: ADAPTERS
                .iter()
                .map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

pub fn adapter_schema(name: &str) -> AppResult<AdapterSchema> {
    Ok(build_adapter(name)?.schema().clone())
}
