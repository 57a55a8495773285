//! Data center with outdoor-temperature dependent cooling and PV self-supply.

use ca_adapter::{
    AdapterResult, AttrField, AttributeAccess, AttrValue, DomainModel, FlatAdapter, FromParams,
    ModelError, ModelParams, ModelResult,
};
use ca_core::{Real, SimTime};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};

use crate::common::{finite, invalid_param};

pub const KIND: &str = "DataCenter";

/// Share of the total power demand released as (negative) waste heat.
const WASTE_HEAT_SHARE: Real = 0.5;

/// Heat is reported with a negative sign: it is fed into the network.
#[derive(Debug, Clone, PartialEq)]
pub struct DataCenter {
    pub max_computing_power: Real,
    pub max_cooling_power: Real,
    /// Outdoor temperature above which cooling starts [°C]
    pub cooling_threshold: Real,
    /// Outdoor temperature at which cooling reaches its maximum [°C]
    pub max_temperature: Real,
    /// Conversion of excess PV into heat
    pub heat_generation_efficiency: Real,

    pub outdoor_temperature: Real,
    /// PV power, negative when producing [W]
    pub pv_input: Real,

    pub electricity_consumption: Real,
    pub waste_heat: Real,
    pub excess_heat: Real,
    pub total_power_demand: Real,

    cooling_rate: Real,
}

impl DataCenter {
    pub fn new(
        max_computing_power: Real,
        max_cooling_power: Real,
        cooling_threshold: Real,
        max_temperature: Real,
        heat_generation_efficiency: Real,
    ) -> ModelResult<Self> {
        if max_temperature <= cooling_threshold {
            return Err(invalid_param(
                "max_temperature",
                format!("must exceed cooling_threshold ({cooling_threshold})"),
            ));
        }
        Ok(Self {
            max_computing_power,
            max_cooling_power,
            cooling_threshold,
            max_temperature,
            heat_generation_efficiency,
            outdoor_temperature: 20.0,
            pv_input: 0.0,
            electricity_consumption: 0.0,
            waste_heat: 0.0,
            excess_heat: 0.0,
            total_power_demand: 0.0,
            cooling_rate: max_cooling_power / (max_temperature - cooling_threshold),
        })
    }

    /// Waste heat plus heat from excess PV.
    pub fn total_heat_output(&self) -> Real {
        self.waste_heat + self.excess_heat
    }

    fn cooling_demand(&self) -> Real {
        if self.outdoor_temperature < self.cooling_threshold {
            return 0.0;
        }
        let demand = self.cooling_rate * (self.outdoor_temperature - self.cooling_threshold);
        demand.min(self.max_cooling_power).max(0.0)
    }
}

impl AttributeAccess for DataCenter {
    const ATTRIBUTES: &'static [&'static str] = &[
        "outdoor_temperature",
        "pv_input",
        "electricity_consumption",
        "total_heat_output",
        "excess_heat",
        "waste_heat",
        "total_power_demand",
    ];

    fn get_attr(&self, attr: &str) -> ModelResult<Option<AttrValue>> {
        let value = match attr {
            "outdoor_temperature" => self.outdoor_temperature,
            "pv_input" => self.pv_input,
            "electricity_consumption" => self.electricity_consumption,
            "total_heat_output" => self.total_heat_output(),
            "excess_heat" => self.excess_heat,
            "waste_heat" => self.waste_heat,
            "total_power_demand" => self.total_power_demand,
            _ => {
                return Err(ModelError::NoSuchAttribute {
                    model: KIND,
                    attr: attr.to_string(),
                });
            }
        };
        Ok(Some(AttrValue::Float(value)))
    }

    fn set_attr(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        let field = match attr {
            "outdoor_temperature" => &mut self.outdoor_temperature,
            "pv_input" => &mut self.pv_input,
            "electricity_consumption" => &mut self.electricity_consumption,
            "excess_heat" => &mut self.excess_heat,
            "waste_heat" => &mut self.waste_heat,
            "total_power_demand" => &mut self.total_power_demand,
            "total_heat_output" => {
                return Err(ModelError::ReadOnly {
                    model: KIND,
                    attr: attr.to_string(),
                });
            }
            _ => {
                return Err(ModelError::NoSuchAttribute {
                    model: KIND,
                    attr: attr.to_string(),
                });
            }
        };
        field.write(attr, value)
    }
}

impl FromParams for DataCenter {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        Self::new(
            params.real("max_computing_power")?,
            params.real("max_cooling_power")?,
            params.real("cooling_threshold")?,
            params.real("max_temperature")?,
            params.real_or("heat_generation_efficiency", 0.9)?,
        )
    }
}

impl DomainModel for DataCenter {
    fn step(&mut self, _time: SimTime, _step_size: SimTime) -> ModelResult<()> {
        let demand = finite(
            self.max_computing_power + self.cooling_demand(),
            "total_power_demand",
        )?;
        let excess_pv = (-self.pv_input - demand).max(0.0);

        self.total_power_demand = demand;
        self.electricity_consumption = (demand + self.pv_input).max(0.0);
        self.waste_heat = -demand * WASTE_HEAT_SHARE;
        self.excess_heat = -excess_pv * self.heat_generation_efficiency;
        Ok(())
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::TimeBased).with_model(
        ModelKindDef::new(KIND)
            .params([
                "max_computing_power",
                "max_cooling_power",
                "cooling_threshold",
                "max_temperature",
                "heat_generation_efficiency",
            ])
            .attrs([
                "outdoor_temperature",
                "pv_input",
                "electricity_consumption",
                "total_heat_output",
                "excess_heat",
            ]),
    )
}

pub fn adapter() -> AdapterResult<FlatAdapter<DataCenter>> {
    FlatAdapter::new(schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_core::{Tolerances, nearly_equal};

    fn center() -> DataCenter {
        DataCenter::new(50.0e3, 50.0e3, 10.0, 40.0, 0.9).unwrap()
    }

    #[test]
    fn cooling_ramps_with_temperature() {
        let mut dc = center();
        dc.outdoor_temperature = 5.0;
        assert_eq!(dc.cooling_demand(), 0.0);
        dc.outdoor_temperature = 25.0;
        assert!(nearly_equal(dc.cooling_demand(), 25.0e3, Tolerances::default()));
        dc.outdoor_temperature = 60.0;
        assert_eq!(dc.cooling_demand(), 50.0e3);
    }

    #[test]
    fn excess_pv_becomes_heat() {
        let mut dc = center();
        dc.outdoor_temperature = 10.0;
        dc.pv_input = -80.0e3;
        dc.step(0, 900).unwrap();

        let tol = Tolerances::default();
        assert_eq!(dc.electricity_consumption, 0.0);
        assert!(nearly_equal(dc.waste_heat, -25.0e3, tol));
        assert!(nearly_equal(dc.excess_heat, -27.0e3, tol));
        assert_eq!(
            dc.get_attr("total_heat_output").unwrap(),
            Some(AttrValue::Float(dc.waste_heat + dc.excess_heat))
        );
    }

    #[test]
    fn grid_covers_missing_power() {
        let mut dc = center();
        dc.outdoor_temperature = 10.0;
        dc.pv_input = -20.0e3;
        dc.step(0, 900).unwrap();
        assert!(nearly_equal(dc.electricity_consumption, 30.0e3, Tolerances::default()));
        assert_eq!(dc.excess_heat, 0.0);
    }

    #[test]
    fn derived_attribute_is_read_only() {
        let mut dc = center();
        let err = dc.set_attr("total_heat_output", 1.0.into()).unwrap_err();
        assert!(matches!(err, ModelError::ReadOnly { .. }));
        dc.set_attr("pv_input", (-3i64).into()).unwrap();
        assert_eq!(dc.pv_input, -3.0);
    }

    #[test]
    fn default_efficiency() {
        let params = ModelParams::new()
            .with("max_computing_power", 1.0)
            .with("max_cooling_power", 1.0)
            .with("cooling_threshold", 10.0)
            .with("max_temperature", 40.0);
        let dc = DataCenter::from_params(&params).unwrap();
        assert_eq!(dc.heat_generation_efficiency, 0.9);
    }
}
