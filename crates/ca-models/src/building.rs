//! Two-node thermal model of a building with a heat storage tank.

use ca_adapter::{
    AdapterResult, AttributeAccess, DomainModel, FlatAdapter, FromParams, ModelParams,
    ModelResult, model_attributes,
};
use ca_core::units::ticks_to_hours;
use ca_core::{Real, SimTime};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};

use crate::common::{finite, invalid_param};

pub const KIND: &str = "Building";

/// Gain applied to the setpoint error when sizing the tank-to-building transfer [W/K].
const SETPOINT_GAIN: Real = 500.0;

/// Lumped building + tank.
///
/// ## Model
///
/// ```text
/// loss     = ua * (T_building - T_outdoor)
/// transfer = clamp(min(k_tank * (T_tank - T_building),
///                      loss + 500 * (T_set - T_building)), 0, ∞)
/// dT_building = (transfer - loss) * dt_h / C_building
/// dT_tank     = (heat_input - transfer) * dt_h / C_tank
/// ```
///
/// The tank never cools the building.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    /// Heat capacity of the building [Wh/K]
    pub thermal_capacity_building: Real,
    /// Heat capacity of the tank [Wh/K]
    pub thermal_capacity_tank: Real,
    /// Building to outside [W/K]
    pub heat_loss_coefficient: Real,
    /// Maximum tank to building transfer [W/K]
    pub tank_to_building_transfer: Real,
    pub setpoint_temperature: Real,

    pub outdoor_temperature: Real,
    pub heat_input: Real,

    pub building_temperature: Real,
    pub tank_temperature: Real,
}

model_attributes!(Building {
    outdoor_temperature,
    heat_input,
    building_temperature,
    tank_temperature,
});

impl Building {
    pub fn new(
        thermal_capacity_building: Real,
        thermal_capacity_tank: Real,
        heat_loss_coefficient: Real,
        tank_to_building_transfer: Real,
        setpoint_temperature: Real,
    ) -> ModelResult<Self> {
        if thermal_capacity_building <= 0.0 {
            return Err(invalid_param("thermal_capacity_building", "must be positive"));
        }
        if thermal_capacity_tank <= 0.0 {
            return Err(invalid_param("thermal_capacity_tank", "must be positive"));
        }
        Ok(Self {
            thermal_capacity_building,
            thermal_capacity_tank,
            heat_loss_coefficient,
            tank_to_building_transfer,
            setpoint_temperature,
            outdoor_temperature: 10.0,
            heat_input: 0.0,
            building_temperature: setpoint_temperature,
            tank_temperature: 45.0,
        })
    }

    fn heat_loss(&self) -> Real {
        self.heat_loss_coefficient * (self.building_temperature - self.outdoor_temperature)
    }

    fn tank_transfer(&self, loss: Real) -> Real {
        let required = loss + SETPOINT_GAIN * (self.setpoint_temperature - self.building_temperature);
        let available =
            self.tank_to_building_transfer * (self.tank_temperature - self.building_temperature);
        available.min(required).max(0.0)
    }
}

impl FromParams for Building {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        Self::new(
            params.real("thermal_capacity_building")?,
            params.real("thermal_capacity_tank")?,
            params.real("heat_loss_coefficient")?,
            params.real("tank_to_building_transfer")?,
            params.real("setpoint_temperature")?,
        )
    }
}

impl DomainModel for Building {
    fn step(&mut self, _time: SimTime, step_size: SimTime) -> ModelResult<()> {
        let dt_h = ticks_to_hours(step_size);
        let loss = self.heat_loss();
        let transfer = self.tank_transfer(loss);

        let building = self.building_temperature
            + (transfer - loss) * dt_h / self.thermal_capacity_building;
        let tank =
            self.tank_temperature + (self.heat_input - transfer) * dt_h / self.thermal_capacity_tank;

        self.building_temperature = finite(building, "building_temperature")?;
        self.tank_temperature = finite(tank, "tank_temperature")?;
        Ok(())
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::TimeBased).with_model(
        ModelKindDef::new(KIND)
            .params([
                "thermal_capacity_building",
                "thermal_capacity_tank",
                "heat_loss_coefficient",
                "tank_to_building_transfer",
                "setpoint_temperature",
            ])
            .attrs(Building::ATTRIBUTES.iter().copied()),
    )
}

pub fn adapter() -> AdapterResult<FlatAdapter<Building>> {
    FlatAdapter::new(schema())
}
