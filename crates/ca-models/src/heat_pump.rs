//! Heat pump drawing heat from the district network into a building tank.

use ca_adapter::{
    AdapterResult, AttributeAccess, DomainModel, FlatAdapter, FromParams, ModelParams,
    ModelResult, model_attributes,
};
use ca_core::units::HEAT_CAPACITY_WATER;
use ca_core::{Real, SimTime};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};

use crate::common::{finite, invalid_param};

pub const KIND: &str = "HeatPump";

/// Modulating heat pump.
///
/// ## Model
///
/// ```text
/// modulation = 1                                   tank < temp_min
///            = 0                                   tank > temp_max
///            = (temp_max - tank) / (temp_max - temp_min)
/// cop        = max(cop_nominal - 0.05 * (temp_max + 10 - supply), 1)
/// heat_out   = min(nominal * modulation, massflow * cp * (temp_max - supply))
/// electric   = heat_out / cop
/// from_net   = heat_out - electric
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HeatPump {
    pub cop_nominal: Real,
    /// Nominal heating capacity [W]
    pub heat_capacity_nominal: Real,
    /// Tank temperature below which the pump runs at full load [°C]
    pub temp_min: Real,
    /// Tank temperature above which the pump stops [°C]
    pub temp_max: Real,

    pub supply_temperature: Real,
    pub massflow: Real,
    pub tank_temperature: Real,

    pub heat_output: Real,
    pub heat_consumption: Real,
    pub electricity_consumption: Real,
}

model_attributes!(HeatPump {
    tank_temperature,
    supply_temperature,
    massflow,
    heat_output,
    heat_consumption,
    electricity_consumption,
});

impl HeatPump {
    pub fn new(
        cop_nominal: Real,
        heat_capacity_nominal: Real,
        temp_min: Real,
        temp_max: Real,
    ) -> ModelResult<Self> {
        if temp_max <= temp_min {
            return Err(invalid_param(
                "temp_max",
                format!("must exceed temp_min ({temp_min})"),
            ));
        }
        if heat_capacity_nominal < 0.0 {
            return Err(invalid_param("heat_capacity_nominal", "must not be negative"));
        }
        Ok(Self {
            cop_nominal,
            heat_capacity_nominal,
            temp_min,
            temp_max,
            supply_temperature: 25.0,
            massflow: 7.5,
            tank_temperature: 20.0,
            heat_output: 0.0,
            heat_consumption: 0.0,
            electricity_consumption: 0.0,
        })
    }

    pub fn modulation(&self) -> Real {
        if self.tank_temperature < self.temp_min {
            1.0
        } else if self.tank_temperature > self.temp_max {
            0.0
        } else {
            (self.temp_max - self.tank_temperature) / (self.temp_max - self.temp_min)
        }
    }

    pub fn cop(&self) -> Real {
        let target = self.temp_max + 10.0;
        (self.cop_nominal - 0.05 * (target - self.supply_temperature)).max(1.0)
    }

    fn max_network_transfer(&self) -> Real {
        self.massflow * HEAT_CAPACITY_WATER * (self.temp_max - self.supply_temperature)
    }
}

impl FromParams for HeatPump {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        Self::new(
            params.real("cop_nominal")?,
            params.real("heat_capacity_nominal")?,
            params.real("temp_min")?,
            params.real("temp_max")?,
        )
    }
}

impl DomainModel for HeatPump {
    fn step(&mut self, _time: SimTime, _step_size: SimTime) -> ModelResult<()> {
        let demand = self.heat_capacity_nominal * self.modulation();
        let heat_output = finite(demand.min(self.max_network_transfer()), "heat_output")?;
        let electricity = heat_output / self.cop();

        self.heat_output = heat_output;
        self.electricity_consumption = electricity;
        self.heat_consumption = heat_output - electricity;
        Ok(())
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::TimeBased).with_model(
        ModelKindDef::new(KIND)
            .params([
                "cop_nominal",
                "heat_capacity_nominal",
                "temp_min",
                "temp_max",
            ])
            .attrs(HeatPump::ATTRIBUTES.iter().copied()),
    )
}

pub fn adapter() -> AdapterResult<FlatAdapter<HeatPump>> {
    FlatAdapter::new(schema())
}
