//! Photovoltaic plant replaying a normalized production profile.

use std::path::Path;

use ca_adapter::{
    AdapterResult, AttributeAccess, DomainModel, FlatAdapter, FromParams, ModelParams,
    ModelResult, model_attributes,
};
use ca_core::{Real, SimTime};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};
use chrono::{NaiveDateTime, TimeDelta};

use crate::timeseries::CsvTimeseries;

pub const KIND: &str = "PvSystem";

/// Output is negative while producing: `power_output = -peak_power * profile(t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PvSystem {
    pub start_time: NaiveDateTime,
    pub peak_power: Real,
    pub power_output: Real,
    profile: CsvTimeseries,
}

model_attributes!(PvSystem { power_output });

impl PvSystem {
    pub fn new(start_time: NaiveDateTime, peak_power: Real, profile: CsvTimeseries) -> Self {
        Self {
            start_time,
            peak_power,
            power_output: 0.0,
            profile,
        }
    }
}

impl FromParams for PvSystem {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        let profile = CsvTimeseries::load(Path::new(params.text("csv_path")?))?;
        Ok(Self::new(
            params.datetime("start_time")?,
            params.real("peak_power")?,
            profile,
        ))
    }
}

impl DomainModel for PvSystem {
    fn step(&mut self, time: SimTime, _step_size: SimTime) -> ModelResult<()> {
        let now = self.start_time + TimeDelta::seconds(time as i64);
        self.power_output = self.profile.value_at_or_before(now)? * -self.peak_power;
        Ok(())
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::TimeBased).with_model(
        ModelKindDef::new(KIND)
            .params(["start_time", "peak_power", "csv_path"])
            .attrs(PvSystem::ATTRIBUTES.iter().copied()),
    )
}

pub fn adapter() -> AdapterResult<FlatAdapter<PvSystem>> {
    FlatAdapter::new(schema())
}
