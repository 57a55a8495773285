//! Driver-facing protocol: payload shapes and the [`Simulator`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use ca_core::{AttrValue, EntityId, SimTime, SourceId};
use ca_schema::{AdapterConfig, AdapterSchema};
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::lifecycle::Phase;
use crate::params::ModelParams;
use crate::topology::DriverClient;

/// Step inputs: entity → attribute → source → value.
pub type Inputs = BTreeMap<EntityId, BTreeMap<String, BTreeMap<SourceId, AttrValue>>>;

/// Output request: entity → requested attributes.
pub type OutputRequest = BTreeMap<EntityId, Vec<String>>;

/// Attribute values returned to the driver, keyed like the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    pub time: SimTime,
    #[serde(flatten)]
    pub entities: BTreeMap<EntityId, BTreeMap<String, AttrValue>>,
}

impl OutputData {
    pub fn new(time: SimTime) -> Self {
        Self {
            time,
            entities: BTreeMap::new(),
        }
    }

    pub fn value(&self, entity: &str, attr: &str) -> Option<&AttrValue> {
        self.entities.get(entity).and_then(|attrs| attrs.get(attr))
    }
}

/// An entity created by the adapter, with its channels when it is a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub eid: EntityId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityDescriptor>,
}

impl EntityDescriptor {
    pub fn leaf(eid: EntityId, kind: impl Into<String>) -> Self {
        Self {
            eid,
            kind: kind.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<EntityDescriptor>) -> Self {
        self.children = children;
        self
    }
}

/// The call sequence a co-simulation driver performs on an adapter.
///
/// Calls are strictly sequential: `init`, any number of `create`,
/// `setup_done`, alternating `step`/`get_data`, then `finalize`.
pub trait Simulator {
    fn schema(&self) -> &AdapterSchema;

    fn phase(&self) -> Phase;

    /// Time of the last accepted step.
    fn time(&self) -> SimTime;

    /// Hand over the driver back-channel. Adapters that never query the
    /// driver ignore it.
    fn connect_driver(&mut self, _client: Arc<dyn DriverClient>) {}

    fn init(&mut self, config: &AdapterConfig) -> AdapterResult<&AdapterSchema>;

    fn create(
        &mut self,
        count: usize,
        kind: &str,
        params: ModelParams,
    ) -> AdapterResult<Vec<EntityDescriptor>>;

    fn setup_done(&mut self) -> AdapterResult<()>;

    /// Apply `inputs`, advance every model and return the next step time.
    fn step(
        &mut self,
        time: SimTime,
        inputs: &Inputs,
        max_advance: Option<SimTime>,
    ) -> AdapterResult<SimTime>;

    fn get_data(&self, request: &OutputRequest) -> AdapterResult<OutputData>;

    fn finalize(&mut self) -> AdapterResult<()>;
}

/// Next step time for an adapter that honours the driver's advance limit.
///
/// A zero limit means "no limit". Fails instead of wrapping past `u64::MAX`.
pub fn next_time(
    time: SimTime,
    step_size: SimTime,
    max_advance: Option<SimTime>,
) -> AdapterResult<SimTime> {
    let advance = match max_advance {
        Some(limit) if limit > 0 => step_size.min(limit),
        _ => step_size,
    };
    time.checked_add(advance)
        .ok_or(AdapterError::TimeOverflow { time, advance })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_time_respects_limit() {
        assert_eq!(next_time(0, 10, None).unwrap(), 10);
        assert_eq!(next_time(10, 10, Some(3)).unwrap(), 13);
        assert_eq!(next_time(10, 10, Some(30)).unwrap(), 20);
        assert_eq!(next_time(5, 10, Some(0)).unwrap(), 15);
    }

    #[test]
    fn next_time_overflow_is_an_error() {
        let err = next_time(u64::MAX - 5, 10, None).unwrap_err();
        assert!(matches!(err, AdapterError::TimeOverflow { advance: 10, .. }));
        assert_eq!(next_time(u64::MAX - 5, 10, Some(5)).unwrap(), u64::MAX);
    }

    #[test]
    fn output_data_flattens_entities() {
        let mut data = OutputData::new(60);
        data.entities.insert(
            EntityId::new("HeatPump_0"),
            BTreeMap::from([("heat_output".to_string(), AttrValue::Float(2.5))]),
        );

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["time"], 60);
        assert_eq!(json["HeatPump_0"]["heat_output"], 2.5);
        assert_eq!(data.value("HeatPump_0", "heat_output"), Some(&AttrValue::Float(2.5)));
        assert!(data.value("HeatPump_0", "cop").is_none());
    }

    #[test]
    fn descriptor_omits_empty_children() {
        let leaf = EntityDescriptor::leaf(EntityId::new("Building_0"), "Building");
        let json = serde_json::to_string(&leaf).unwrap();
        assert_eq!(json, r#"{"eid":"Building_0","type":"Building"}"#);
    }
}
