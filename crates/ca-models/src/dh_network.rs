//! District heating network with one heat exchanger per connected consumer.
//!
//! The network is a controller model: every entity connected to one of its
//! channels becomes a consumer, and consumers are assigned to the heat
//! exchangers of the network definition in channel order. Consumers beyond
//! the last heat exchanger stay unassigned.

use std::collections::BTreeMap;
use std::path::Path;

use ca_adapter::{
    AdapterResult, AttributeAccess, ControllerModel, DomainModel, FromParams,
    HierarchicalAdapter, ModelError, ModelParams, ModelResult, model_attributes,
};
use ca_core::units::{HEAT_CAPACITY_WATER, celsius_to_kelvin, kelvin_to_celsius};
use ca_core::{Real, SimTime, SystemKey};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::{finite, invalid_param};

pub const KIND: &str = "DHNetwork";
pub const CHANNEL_KIND: &str = "HeatExchanger";

const DEFAULT_GRID_MASSFLOW: Real = 5.0;

/// `[name, from_junction, to_junction, initial_heat_consumption]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatExchangerDef(pub String, pub String, pub String, pub Real);

impl HeatExchangerDef {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn initial_consumption(&self) -> Real {
        self.3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalGrid {
    /// [°C]
    pub supply_temperature: Real,
    #[serde(default)]
    pub junction: Option<String>,
    #[serde(default)]
    pub sink_node: Option<String>,
    /// [bar]
    #[serde(default)]
    pub pressure: Option<Real>,
    #[serde(default)]
    pub ambient_temperature: Option<Real>,
}

/// JSON network definition. Pipe, valve and junction geometry is accepted
/// but unused by the closed-form step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub heat_exchangers: Vec<HeatExchangerDef>,
    pub external_grid: ExternalGrid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub junctions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipes: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valves: Vec<serde_json::Value>,
}

impl NetworkDefinition {
    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definition: Self = serde_json::from_str(&content).map_err(|e| ModelError::Data {
            what: format!("{}: {e}", path.display()),
        })?;
        definition.check()?;
        Ok(definition)
    }

    fn check(&self) -> ModelResult<()> {
        finite(self.external_grid.supply_temperature, "supply_temperature")?;
        let mut seen = std::collections::HashSet::new();
        for hex in &self.heat_exchangers {
            if !seen.insert(hex.name()) {
                return Err(ModelError::Data {
                    what: format!("duplicate heat exchanger '{}'", hex.name()),
                });
            }
        }
        Ok(())
    }
}

/// State of one consumer, exposed through a heat exchanger channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Consumer {
    /// Heat taken from the network, negative when feeding in [W]
    pub heat_consumption: Real,
    /// [°C]
    pub supply_temperature: Real,
    /// [kg/s]
    pub massflow: Real,
}

model_attributes!(Consumer {
    heat_consumption,
    supply_temperature,
    massflow
});

/// ## Model
///
/// ```text
/// m_hex     = grid_massflow / n_hex
/// T_supply  = external grid supply temperature
/// T_out,i   = T_supply - q_i / (m_hex * cp)
/// T_return  = mean(T_out,i)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DhNetwork {
    pub grid_massflow: Real,
    /// [°C]
    pub grid_return_temperature: Real,
    definition: NetworkDefinition,
    /// Heat consumption per heat exchanger, in definition order.
    loads: Vec<Real>,
    outlet_temperatures: Vec<Real>,
    consumers: BTreeMap<SystemKey, Consumer>,
    assignment: BTreeMap<SystemKey, usize>,
}

model_attributes!(DhNetwork {
    grid_return_temperature
});

impl DhNetwork {
    pub fn new(definition: NetworkDefinition, grid_massflow: Real) -> ModelResult<Self> {
        if grid_massflow <= 0.0 {
            return Err(invalid_param("grid_massflow", "must be positive"));
        }
        definition.check()?;
        let loads = definition
            .heat_exchangers
            .iter()
            .map(HeatExchangerDef::initial_consumption)
            .collect();
        Ok(Self {
            grid_massflow,
            grid_return_temperature: 25.0,
            definition,
            loads,
            outlet_temperatures: Vec::new(),
            consumers: BTreeMap::new(),
            assignment: BTreeMap::new(),
        })
    }

    pub fn definition(&self) -> &NetworkDefinition {
        &self.definition
    }

    /// Heat exchanger a consumer is attached to.
    pub fn heat_exchanger_of(&self, key: &SystemKey) -> Option<&str> {
        self.assignment
            .get(key)
            .map(|&i| self.definition.heat_exchangers[i].name())
    }

    /// Outlet temperature per heat exchanger after the last step [°C].
    pub fn outlet_temperatures(&self) -> &[Real] {
        &self.outlet_temperatures
    }

    fn supply_temperature(&self) -> Real {
        self.definition.external_grid.supply_temperature
    }
}

impl FromParams for DhNetwork {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        let definition = NetworkDefinition::load(Path::new(params.text("network_definition_path")?))?;
        Self::new(
            definition,
            params.real_or("grid_massflow", DEFAULT_GRID_MASSFLOW)?,
        )
    }
}

impl DomainModel for DhNetwork {
    fn step(&mut self, _time: SimTime, _step_size: SimTime) -> ModelResult<()> {
        for (key, &hex) in &self.assignment {
            if let Some(consumer) = self.consumers.get(key) {
                self.loads[hex] = consumer.heat_consumption;
            }
        }

        let supply = self.supply_temperature();
        if self.loads.is_empty() {
            self.grid_return_temperature = supply;
            return Ok(());
        }

        let massflow = self.grid_massflow / self.loads.len() as Real;
        let supply_k = celsius_to_kelvin(supply);
        let mut outlets = Vec::with_capacity(self.loads.len());
        for q in &self.loads {
            let outlet_k = supply_k - q / (massflow * HEAT_CAPACITY_WATER);
            outlets.push(finite(kelvin_to_celsius(outlet_k), "outlet_temperature")?);
        }
        let mean_k = outlets.iter().map(|t| celsius_to_kelvin(*t)).sum::<Real>() / outlets.len() as Real;

        for key in self.assignment.keys() {
            if let Some(consumer) = self.consumers.get_mut(key) {
                consumer.supply_temperature = supply;
                consumer.massflow = massflow;
            }
        }
        self.grid_return_temperature = finite(kelvin_to_celsius(mean_k), "grid_return_temperature")?;
        self.outlet_temperatures = outlets;
        Ok(())
    }
}

impl ControllerModel for DhNetwork {
    type System = Consumer;

    fn initialize_controlled_systems(&mut self, keys: &[SystemKey]) -> ModelResult<()> {
        let supply = self.supply_temperature();
        self.assignment.clear();
        self.consumers = keys
            .iter()
            .map(|key| {
                let consumer = Consumer {
                    supply_temperature: supply,
                    massflow: self.grid_massflow,
                    ..Consumer::default()
                };
                (key.clone(), consumer)
            })
            .collect();
        Ok(())
    }

    fn bind_own_systems(&mut self, keys: &[SystemKey]) -> ModelResult<()> {
        let exchangers = &self.definition.heat_exchangers;
        if keys.len() > exchangers.len() {
            warn!(
                consumers = keys.len(),
                heat_exchangers = exchangers.len(),
                "more consumers than heat exchangers, extra consumers stay unassigned"
            );
        }

        for (i, (key, hex)) in keys.iter().zip(exchangers).enumerate() {
            let consumer = self.consumers.entry(key.clone()).or_default();
            consumer.heat_consumption = hex.initial_consumption();
            consumer.supply_temperature = self.definition.external_grid.supply_temperature;
            consumer.massflow = self.grid_massflow;
            self.assignment.insert(key.clone(), i);
            debug!(consumer = %key, heat_exchanger = hex.name(), "assigned consumer");
        }
        Ok(())
    }

    fn controlled_system(&self, key: &SystemKey) -> Option<&Consumer> {
        self.consumers.get(key)
    }

    fn controlled_system_mut(&mut self, key: &SystemKey) -> Option<&mut Consumer> {
        self.consumers.get_mut(key)
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::Hybrid)
        .with_model(
            ModelKindDef::new(KIND)
                .params(["network_definition_path", "num_channels", "grid_massflow"])
                .attrs(DhNetwork::ATTRIBUTES.iter().copied()),
        )
        .with_model(
            ModelKindDef::new(CHANNEL_KIND)
                .attrs(Consumer::ATTRIBUTES.iter().copied())
                .persistent(Consumer::ATTRIBUTES.iter().copied()),
        )
}

pub fn adapter() -> AdapterResult<HierarchicalAdapter<DhNetwork>> {
    HierarchicalAdapter::new(schema())
}
