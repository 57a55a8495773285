//! Adapter for schemas with a single model kind.
//!
//! Every created entity wraps one independent model instance. Inputs are
//! applied by entity id, one value per attribute.

use std::collections::BTreeMap;

use ca_core::{EntityId, SimTime, entity_eid};
use ca_schema::{AdapterConfig, AdapterSchema, ModelKindDef, validate_accessors, validate_arity};
use tracing::{debug, info};

use crate::access::{check_input, check_params, kind_list, read_attributes};
use crate::error::{AdapterError, AdapterResult};
use crate::lifecycle::{self, Lifecycle, Phase};
use crate::model::{DomainModel, FromParams};
use crate::params::ModelParams;
use crate::protocol::{EntityDescriptor, Inputs, OutputData, OutputRequest, Simulator, next_time};
use crate::routing::first_source;

pub struct FlatAdapter<M> {
    schema: AdapterSchema,
    kind: ModelKindDef,
    prefix: String,
    sim_id: String,
    step_size: SimTime,
    time: SimTime,
    lifecycle: Lifecycle,
    next_index: usize,
    entities: BTreeMap<EntityId, M>,
    order: Vec<EntityId>,
}

impl<M: DomainModel + FromParams> FlatAdapter<M> {
    /// Fails unless `schema` has exactly one kind whose attributes `M` serves.
    pub fn new(schema: AdapterSchema) -> AdapterResult<Self> {
        let kind = validate_arity(&schema, "FlatAdapter", 1)?[0].clone();
        validate_accessors(&kind, M::ATTRIBUTES)?;
        let prefix = format!("{}_", kind.name);
        Ok(Self {
            schema,
            kind,
            prefix,
            sim_id: String::new(),
            step_size: 1,
            time: 0,
            lifecycle: Lifecycle::default(),
            next_index: 0,
            entities: BTreeMap::new(),
            order: Vec::new(),
        })
    }

    pub fn kind(&self) -> &ModelKindDef {
        &self.kind
    }

    pub fn entity(&self, eid: &str) -> Option<&M> {
        self.entities.get(eid)
    }

    /// Entity ids in creation order.
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.order
    }

    fn validate_inputs(&self, inputs: &Inputs) -> AdapterResult<()> {
        for (eid, attrs) in inputs {
            if !self.entities.contains_key(eid) {
                return Err(AdapterError::UnknownFlatEntity {
                    id: eid.to_string(),
                    kind: self.kind.name.clone(),
                });
            }
            for attr in attrs.keys() {
                check_input(&self.kind, eid, attr)?;
            }
        }
        Ok(())
    }
}

impl<M: DomainModel + FromParams> Simulator for FlatAdapter<M> {
    fn schema(&self) -> &AdapterSchema {
        &self.schema
    }

    fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    fn time(&self) -> SimTime {
        self.time
    }

    fn init(&mut self, config: &AdapterConfig) -> AdapterResult<&AdapterSchema> {
        self.lifecycle.require("init", lifecycle::INIT)?;
        config.check()?;
        self.sim_id = config.sim_id.clone();
        self.step_size = config.step_size;
        if let Some(prefix) = &config.eid_prefix {
            self.prefix = prefix.clone();
        }
        self.lifecycle.enter(Phase::Initialized);
        info!(
            sim_id = %self.sim_id,
            kind = %self.kind.name,
            step_size = self.step_size,
            "flat adapter initialized"
        );
        Ok(&self.schema)
    }

    fn create(
        &mut self,
        count: usize,
        kind: &str,
        params: ModelParams,
    ) -> AdapterResult<Vec<EntityDescriptor>> {
        self.lifecycle.require("create", lifecycle::CREATE)?;
        if kind != self.kind.name {
            return Err(AdapterError::InvalidModel {
                requested: kind.to_string(),
                provided: kind_list(&[&self.kind]),
            });
        }
        check_params(&self.kind, &params)?;

        let models = (0..count)
            .map(|_| M::from_params(&params))
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = Vec::with_capacity(count);
        for model in models {
            let eid = entity_eid(&self.prefix, self.next_index);
            self.next_index += 1;
            created.push(EntityDescriptor::leaf(eid.clone(), kind));
            self.order.push(eid.clone());
            self.entities.insert(eid, model);
        }
        debug!(kind, count, total = self.order.len(), "created entities");
        self.lifecycle.enter(Phase::Populated);
        Ok(created)
    }

    fn setup_done(&mut self) -> AdapterResult<()> {
        self.lifecycle.require("setup_done", lifecycle::SETUP_DONE)?;
        self.lifecycle.enter(Phase::Ready);
        Ok(())
    }

    fn step(
        &mut self,
        time: SimTime,
        inputs: &Inputs,
        max_advance: Option<SimTime>,
    ) -> AdapterResult<SimTime> {
        self.lifecycle.require("step", lifecycle::QUERY)?;
        if time < self.time {
            return Err(AdapterError::TimeRegression {
                requested: time,
                current: self.time,
            });
        }
        self.validate_inputs(inputs)?;
        let next = next_time(time, self.step_size, max_advance)?;

        for (eid, attrs) in inputs {
            let Some(model) = self.entities.get_mut(eid) else {
                continue;
            };
            for (attr, sources) in attrs {
                if let Some((_, value)) = first_source(eid, attr, sources) {
                    model.set_attr(attr, value.clone())?;
                }
            }
        }

        for eid in &self.order {
            if let Some(model) = self.entities.get_mut(eid) {
                model.step(time, self.step_size)?;
            }
        }

        self.time = time;
        if !self.order.is_empty() {
            self.lifecycle.enter(Phase::Stepping);
        }
        Ok(next)
    }

    fn get_data(&self, request: &OutputRequest) -> AdapterResult<OutputData> {
        self.lifecycle.require("get_data", lifecycle::QUERY)?;
        let mut data = OutputData::new(self.time);
        for (eid, attrs) in request {
            let model = self
                .entities
                .get(eid)
                .ok_or_else(|| AdapterError::UnknownFlatEntity {
                    id: eid.to_string(),
                    kind: self.kind.name.clone(),
                })?;
            let values = read_attributes(&self.kind, model, eid, attrs)?;
            data.entities.insert(eid.clone(), values);
        }
        Ok(data)
    }

    fn finalize(&mut self) -> AdapterResult<()> {
        self.lifecycle.require("finalize", lifecycle::FINALIZE)?;
        self.lifecycle.enter(Phase::Finalized);
        info!(sim_id = %self.sim_id, entities = self.order.len(), "flat adapter finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelResult};
    use ca_core::{AttrValue, Real, SourceId};
    use ca_schema::SimulatorType;

    #[derive(Debug, Default)]
    struct Counter {
        count: Real,
        increment: Real,
        last_time: Option<i64>,
    }

    crate::model_attributes!(Counter {
        count,
        increment,
        last_time
    });

    impl FromParams for Counter {
        fn from_params(params: &ModelParams) -> ModelResult<Self> {
            let increment = params.real_or("increment", 1.0)?;
            if increment < 0.0 {
                return Err(ModelError::InvalidParam {
                    name: "increment".to_string(),
                    reason: "must not be negative".to_string(),
                });
            }
            Ok(Self {
                increment,
                ..Self::default()
            })
        }
    }

    impl DomainModel for Counter {
        fn step(&mut self, time: SimTime, _step_size: SimTime) -> ModelResult<()> {
            self.count += self.increment;
            self.last_time = Some(time as i64);
            Ok(())
        }
    }

    fn schema() -> AdapterSchema {
        AdapterSchema::new(SimulatorType::TimeBased).with_model(
            ModelKindDef::new("Counter")
                .params(["increment"])
                .attrs(["count", "increment", "last_time"]),
        )
    }

    fn ready(step_size: SimTime) -> FlatAdapter<Counter> {
        let mut adapter = FlatAdapter::new(schema()).unwrap();
        adapter.init(&AdapterConfig::new("CounterSim-0", step_size)).unwrap();
        adapter
    }

    fn inputs(eid: &str, attr: &str, values: &[(&str, f64)]) -> Inputs {
        let sources = values
            .iter()
            .map(|(s, v)| (SourceId::new(*s), AttrValue::Float(*v)))
            .collect();
        Inputs::from([(
            EntityId::new(eid),
            BTreeMap::from([(attr.to_string(), sources)]),
        )])
    }

    fn request(eid: &str, attrs: &[&str]) -> OutputRequest {
        OutputRequest::from([(
            EntityId::new(eid),
            attrs.iter().map(|a| a.to_string()).collect(),
        )])
    }

    #[test]
    fn rejects_two_kind_schema() {
        let schema = schema().with_model(ModelKindDef::new("Other"));
        let err = FlatAdapter::<Counter>::new(schema).err().unwrap();
        assert!(err.to_string().contains("2 were specified"));
    }

    #[test]
    fn rejects_attribute_without_accessor() {
        let schema = AdapterSchema::new(SimulatorType::TimeBased)
            .with_model(ModelKindDef::new("Counter").attrs(["count", "volume"]));
        assert!(FlatAdapter::<Counter>::new(schema).is_err());
    }

    #[test]
    fn ids_continue_across_creates() {
        let mut adapter = ready(1);
        let first = adapter.create(2, "Counter", ModelParams::new()).unwrap();
        let second = adapter.create(1, "Counter", ModelParams::new()).unwrap();
        let ids: Vec<_> = first.iter().chain(&second).map(|e| e.eid.as_str()).collect();
        assert_eq!(ids, vec!["Counter_0", "Counter_1", "Counter_2"]);
        assert!(first.iter().all(|e| e.kind == "Counter" && e.children.is_empty()));
    }

    #[test]
    fn eid_prefix_override() {
        let mut adapter = FlatAdapter::<Counter>::new(schema()).unwrap();
        adapter
            .init(&AdapterConfig::new("CounterSim-0", 1).with_eid_prefix("C"))
            .unwrap();
        let created = adapter.create(1, "Counter", ModelParams::new()).unwrap();
        assert_eq!(created[0].eid.as_str(), "C0");
    }

    #[test]
    fn create_validates_kind_and_params() {
        let mut adapter = ready(1);
        let err = adapter.create(1, "Other", ModelParams::new()).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidModel { .. }));

        let err = adapter
            .create(1, "Counter", ModelParams::new().with("volume", 2.0))
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnknownParameter { .. }));

        let err = adapter
            .create(3, "Counter", ModelParams::new().with("increment", -1.0))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Model(_)));
        assert!(adapter.entity_ids().is_empty());
        assert_eq!(adapter.phase(), Phase::Initialized);
    }

    #[test]
    fn step_applies_inputs_then_steps() {
        let mut adapter = ready(10);
        adapter
            .create(2, "Counter", ModelParams::new().with("increment", 2.0))
            .unwrap();
        adapter.setup_done().unwrap();

        let next = adapter
            .step(0, &inputs("Counter_1", "increment", &[("b", 9.0), ("a", 5.0)]), None)
            .unwrap();
        assert_eq!(next, 10);

        let data = adapter
            .get_data(&request("Counter_1", &["count", "last_time"]))
            .unwrap();
        assert_eq!(data.time, 0);
        assert_eq!(data.value("Counter_1", "count"), Some(&AttrValue::Float(5.0)));
        assert_eq!(data.value("Counter_1", "last_time"), Some(&AttrValue::Int(0)));
        assert_eq!(adapter.entity("Counter_0").unwrap().count, 2.0);
    }

    #[test]
    fn max_advance_caps_next_time() {
        let mut adapter = ready(10);
        adapter.create(1, "Counter", ModelParams::new()).unwrap();
        adapter.setup_done().unwrap();
        assert_eq!(adapter.step(0, &Inputs::new(), Some(4)).unwrap(), 4);
        assert_eq!(adapter.step(4, &Inputs::new(), Some(0)).unwrap(), 14);
    }

    #[test]
    fn unset_values_are_omitted() {
        let mut adapter = ready(1);
        adapter.create(1, "Counter", ModelParams::new()).unwrap();
        let data = adapter.get_data(&request("Counter_0", &["last_time", "count"])).unwrap();
        let attrs = &data.entities[&EntityId::new("Counter_0")];
        assert!(attrs.contains_key("count"));
        assert!(!attrs.contains_key("last_time"));
    }

    #[test]
    fn unknown_entity_or_attribute() {
        let mut adapter = ready(1);
        adapter.create(1, "Counter", ModelParams::new()).unwrap();
        adapter.setup_done().unwrap();

        let err = adapter
            .step(0, &inputs("Counter_7", "increment", &[("a", 1.0)]), None)
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnknownFlatEntity { .. }));

        let err = adapter
            .step(0, &inputs("Counter_0", "volume", &[("a", 1.0)]), None)
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnknownAttribute { .. }));
        assert_eq!(adapter.entity("Counter_0").unwrap().count, 0.0);

        let err = adapter.get_data(&request("Counter_0", &["volume"])).unwrap_err();
        assert!(matches!(err, AdapterError::UnknownAttribute { .. }));
    }

    #[test]
    fn get_data_is_idempotent_between_steps() {
        let mut adapter = ready(10);
        adapter.create(2, "Counter", ModelParams::new()).unwrap();
        adapter.setup_done().unwrap();
        adapter
            .step(0, &inputs("Counter_0", "increment", &[("a", 3.0)]), None)
            .unwrap();

        let request = request("Counter_0", &["count", "increment", "last_time"]);
        let first = adapter.get_data(&request).unwrap();
        let second = adapter.get_data(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value("Counter_0", "count"), Some(&AttrValue::Float(3.0)));
    }

    #[test]
    fn clock_overflow_leaves_models_untouched() {
        let mut adapter = ready(10);
        adapter.create(1, "Counter", ModelParams::new()).unwrap();
        adapter.setup_done().unwrap();

        let err = adapter
            .step(u64::MAX - 1, &inputs("Counter_0", "increment", &[("a", 4.0)]), None)
            .unwrap_err();
        assert!(matches!(err, AdapterError::TimeOverflow { .. }));
        let counter = adapter.entity("Counter_0").unwrap();
        assert_eq!(counter.increment, 1.0);
        assert_eq!(counter.count, 0.0);
        assert_eq!(adapter.time(), 0);
    }

    #[test]
    fn time_cannot_go_back() {
        let mut adapter = ready(5);
        adapter.create(1, "Counter", ModelParams::new()).unwrap();
        adapter.setup_done().unwrap();
        adapter.step(10, &Inputs::new(), None).unwrap();
        adapter.step(10, &Inputs::new(), None).unwrap();
        let err = adapter.step(5, &Inputs::new(), None).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::TimeRegression {
                requested: 5,
                current: 10
            }
        ));
    }

    #[test]
    fn lifecycle_order_enforced() {
        let mut adapter = FlatAdapter::<Counter>::new(schema()).unwrap();
        assert!(adapter.create(1, "Counter", ModelParams::new()).is_err());

        adapter.init(&AdapterConfig::new("CounterSim-0", 1)).unwrap();
        assert!(adapter.init(&AdapterConfig::new("CounterSim-0", 1)).is_err());

        adapter.setup_done().unwrap();
        assert!(adapter.setup_done().is_err());
        assert!(adapter.create(1, "Counter", ModelParams::new()).is_err());

        adapter.finalize().unwrap();
        assert!(adapter.step(0, &Inputs::new(), None).is_err());
        assert!(adapter.finalize().is_err());
    }

    #[test]
    fn zero_step_size_rejected_at_init() {
        let mut adapter = FlatAdapter::<Counter>::new(schema()).unwrap();
        let err = adapter.init(&AdapterConfig::new("CounterSim-0", 0)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn step_before_create_is_noop() {
        let mut adapter = ready(3);
        assert_eq!(adapter.step(0, &Inputs::new(), None).unwrap(), 3);
        assert_eq!(adapter.phase(), Phase::Initialized);
    }
}
