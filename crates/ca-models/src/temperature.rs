//! Outdoor temperature replayed from a measured series.

use std::path::Path;

use ca_adapter::{
    AdapterResult, AttributeAccess, DomainModel, FlatAdapter, FromParams, ModelParams,
    ModelResult, model_attributes,
};
use ca_core::{Real, SimTime};
use ca_schema::{AdapterSchema, ModelKindDef, SimulatorType};
use chrono::{NaiveDateTime, TimeDelta};

use crate::timeseries::CsvTimeseries;

pub const KIND: &str = "Temperature";

#[derive(Debug, Clone, PartialEq)]
pub struct Temperature {
    pub start_time: NaiveDateTime,
    /// [°C]
    pub temperature: Real,
    series: CsvTimeseries,
}

model_attributes!(Temperature { temperature });

impl Temperature {
    pub fn new(start_time: NaiveDateTime, series: CsvTimeseries) -> Self {
        Self {
            start_time,
            temperature: 20.0,
            series,
        }
    }
}

impl FromParams for Temperature {
    fn from_params(params: &ModelParams) -> ModelResult<Self> {
        let series = CsvTimeseries::load(Path::new(params.text("csv_path")?))?;
        Ok(Self::new(params.datetime("start_time")?, series))
    }
}

impl DomainModel for Temperature {
    fn step(&mut self, time: SimTime, _step_size: SimTime) -> ModelResult<()> {
        let now = self.start_time + TimeDelta::seconds(time as i64);
        self.temperature = self.series.value_at_or_before(now)?;
        Ok(())
    }
}

pub fn schema() -> AdapterSchema {
    AdapterSchema::new(SimulatorType::TimeBased).with_model(
        ModelKindDef::new(KIND)
            .params(["start_time", "csv_path"])
            .attrs(Temperature::ATTRIBUTES.iter().copied()),
    )
}

pub fn adapter() -> AdapterResult<FlatAdapter<Temperature>> {
    FlatAdapter::new(schema())
}
