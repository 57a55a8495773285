//! Adapter for a controller kind plus a channel kind.
//!
//! Each controller entity owns a fixed number of channel entities. A channel
//! is a handle on one of the controller's controlled systems; which system it
//! is becomes known only after `setup_done` asks the driver which entities are
//! connected to each channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use ca_core::{AttrValue, EntityId, FullId, SimTime, SourceId, SystemKey, channel_eid, entity_eid};
use ca_schema::{
    AdapterConfig, AdapterSchema, ModelKindDef, validate_accessors, validate_arity,
};
use tracing::{debug, info, warn};

use crate::access::{check_input, check_params, kind_list, read_attributes};
use crate::error::{AdapterError, AdapterResult};
use crate::lifecycle::{self, Lifecycle, Phase};
use crate::model::{AttributeAccess, ControllerModel};
use crate::params::ModelParams;
use crate::protocol::{EntityDescriptor, Inputs, OutputData, OutputRequest, Simulator};
use crate::routing::{ControllerInputs, Route, SourceValues, first_source, partition};
use crate::topology::{DriverClient, SystemChannelMap, block_on_driver};

/// Constructor parameter holding the number of channels per controller.
pub const CHANNEL_COUNT_PARAM: &str = "num_channels";

struct ControllerEntry<C> {
    model: C,
    channels: Vec<EntityId>,
}

pub struct HierarchicalAdapter<C> {
    schema: AdapterSchema,
    controller_kind: ModelKindDef,
    channel_kind: ModelKindDef,
    sim_id: String,
    step_size: SimTime,
    time: SimTime,
    lifecycle: Lifecycle,
    next_index: usize,
    controllers: BTreeMap<EntityId, ControllerEntry<C>>,
    /// Controller ids in creation order.
    order: Vec<EntityId>,
    channel_owner: BTreeMap<EntityId, EntityId>,
    systems: SystemChannelMap,
    driver: Option<Arc<dyn DriverClient>>,
}

impl<C: ControllerModel> HierarchicalAdapter<C> {
    /// The first schema kind is the controller, the second the channel.
    pub fn new(schema: AdapterSchema) -> AdapterResult<Self> {
        let kinds = validate_arity(&schema, "HierarchicalAdapter", 2)?;
        let controller_kind = kinds[0].clone();
        let channel_kind = kinds[1].clone();
        validate_accessors(&controller_kind, C::ATTRIBUTES)?;
        validate_accessors(&channel_kind, <C::System as AttributeAccess>::ATTRIBUTES)?;
        if !controller_kind.has_param(CHANNEL_COUNT_PARAM) {
            return Err(AdapterError::Configuration {
                what: format!(
                    "controller kind {} must declare the '{CHANNEL_COUNT_PARAM}' parameter",
                    controller_kind.name
                ),
            });
        }

        Ok(Self {
            schema,
            controller_kind,
            channel_kind,
            sim_id: String::new(),
            step_size: 1,
            time: 0,
            lifecycle: Lifecycle::default(),
            next_index: 0,
            controllers: BTreeMap::new(),
            order: Vec::new(),
            channel_owner: BTreeMap::new(),
            systems: SystemChannelMap::default(),
            driver: None,
        })
    }

    pub fn with_driver(mut self, client: Arc<dyn DriverClient>) -> Self {
        self.driver = Some(client);
        self
    }

    pub fn controller(&self, eid: &str) -> Option<&C> {
        self.controllers.get(eid).map(|entry| &entry.model)
    }

    /// Channel ids of a controller, in allocation order.
    pub fn channels_of(&self, eid: &str) -> Option<&[EntityId]> {
        self.controllers.get(eid).map(|entry| entry.channels.as_slice())
    }

    pub fn system_map(&self) -> &SystemChannelMap {
        &self.systems
    }

    fn all_channels(&self) -> Vec<EntityId> {
        self.order
            .iter()
            .filter_map(|id| self.controllers.get(id))
            .flat_map(|entry| entry.channels.iter().cloned())
            .collect()
    }

    fn route(&self, eid: &EntityId) -> AdapterResult<Route> {
        if self.controllers.contains_key(eid) {
            return Ok(Route::Controller(eid.clone()));
        }
        match self.channel_owner.get(eid) {
            Some(controller) => Ok(Route::Channel {
                controller: controller.clone(),
                channel: eid.clone(),
            }),
            None => Err(self.unknown_entity(eid)),
        }
    }

    fn unknown_entity(&self, eid: &EntityId) -> AdapterError {
        AdapterError::UnknownEntity {
            id: eid.to_string(),
            controller_kind: self.controller_kind.name.clone(),
            channel_kind: self.channel_kind.name.clone(),
        }
    }

    fn resolve_topology(&mut self) -> AdapterResult<()> {
        let channels = self.all_channels();
        if channels.is_empty() {
            return Ok(());
        }
        let driver = self
            .driver
            .as_ref()
            .ok_or_else(|| AdapterError::topology("no driver client connected"))?;
        let full_ids = channels
            .iter()
            .map(|c| FullId::new(self.sim_id.as_str(), c.clone()).to_string())
            .collect();
        let related = block_on_driver(driver.related_entities(full_ids))?;
        self.systems = SystemChannelMap::from_related(&self.sim_id, &channels, &related)?;
        Ok(())
    }

    /// Check and resolve one controller's inputs without touching any model.
    fn plan_inputs(
        &self,
        controller_id: &EntityId,
        inputs: &ControllerInputs,
    ) -> AdapterResult<InputPlan> {
        let entry = self
            .controllers
            .get(controller_id)
            .ok_or_else(|| self.unknown_entity(controller_id))?;
        let mut plan = InputPlan {
            controller: controller_id.clone(),
            direct: Vec::new(),
            systems: Vec::new(),
        };

        for (attr, sources) in &inputs.direct {
            check_input(&self.controller_kind, controller_id, attr)?;
            if let Some((_, value)) = first_source(controller_id, attr, sources) {
                plan.direct.push((attr.clone(), value.clone()));
            }
        }

        for (channel, attrs) in &inputs.channels {
            for (attr, sources) in attrs {
                check_input(&self.channel_kind, channel, attr)?;
                let mut per_system: BTreeMap<SystemKey, SourceValues> = BTreeMap::new();
                for (source, value) in sources {
                    let key =
                        input_system(&entry.model, &self.systems, controller_id, channel, source)?;
                    per_system
                        .entry(key)
                        .or_default()
                        .insert(source.clone(), value.clone());
                }
                // Sources sharing a system fall back to the single-source tie-break.
                for (key, sources) in per_system {
                    if let Some((_, value)) = first_source(channel, attr, &sources) {
                        plan.systems.push((key, attr.clone(), value.clone()));
                    }
                }
            }
        }
        Ok(plan)
    }

    fn apply_plan(&mut self, plan: InputPlan) -> AdapterResult<()> {
        let Some(entry) = self.controllers.get_mut(&plan.controller) else {
            return Ok(());
        };
        for (attr, value) in plan.direct {
            entry.model.set_attr(&attr, value)?;
        }
        for (key, attr, value) in plan.systems {
            if let Some(system) = entry.model.controlled_system_mut(&key) {
                system.set_attr(&attr, value)?;
            }
        }
        Ok(())
    }
}

/// Writes for one controller, resolved before any of them is applied.
struct InputPlan {
    controller: EntityId,
    direct: Vec<(String, AttrValue)>,
    systems: Vec<(SystemKey, String, AttrValue)>,
}

/// System an input from `source` on `channel` is written to.
///
/// A source that is itself a controlled system is written to directly.
/// Otherwise the value goes to the system bound to the channel.
fn input_system<C: ControllerModel>(
    model: &C,
    systems: &SystemChannelMap,
    controller: &EntityId,
    channel: &EntityId,
    source: &SourceId,
) -> AdapterResult<SystemKey> {
    let by_source = SystemKey::from_source(source);
    if model.controlled_system(&by_source).is_some() {
        if let Some(bound) = systems.channel_of(&by_source).filter(|c| *c != channel) {
            warn!(
                source = %source,
                channel = %channel,
                bound = %bound,
                "input arrived on a channel its source is not connected to"
            );
        }
        return Ok(by_source);
    }
    match systems
        .system_of(channel)
        .filter(|system| model.controlled_system(system).is_some())
    {
        Some(system) => {
            warn!(
                source = %source,
                channel = %channel,
                system = %system,
                "source is not a controlled system, writing to the channel's system"
            );
            Ok(system.clone())
        }
        None => Err(AdapterError::UnknownSystem {
            controller: controller.to_string(),
            system: by_source.to_string(),
        }),
    }
}

impl<C: ControllerModel> Simulator for HierarchicalAdapter<C> {
    fn schema(&self) -> &AdapterSchema {
        &self.schema
    }

    fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    fn time(&self) -> SimTime {
        self.time
    }

    fn connect_driver(&mut self, client: Arc<dyn DriverClient>) {
        self.driver = Some(client);
    }

    fn init(&mut self, config: &AdapterConfig) -> AdapterResult<&AdapterSchema> {
        self.lifecycle.require("init", lifecycle::INIT)?;
        config.check()?;
        self.sim_id = config.sim_id.clone();
        self.step_size = config.step_size;
        self.lifecycle.enter(Phase::Initialized);
        info!(
            sim_id = %self.sim_id,
            controller = %self.controller_kind.name,
            channel = %self.channel_kind.name,
            step_size = self.step_size,
            "hierarchical adapter initialized"
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
        if kind == self.channel_kind.name {
            return Err(AdapterError::ChannelCreation {
                channel: self.channel_kind.name.clone(),
                controller: self.controller_kind.name.clone(),
            });
        }
        if kind != self.controller_kind.name {
            return Err(AdapterError::InvalidModel {
                requested: kind.to_string(),
                provided: kind_list(&[&self.controller_kind]),
            });
        }
        check_params(&self.controller_kind, &params)?;

        let mut params = params;
        let channel_count =
            params
                .count(CHANNEL_COUNT_PARAM)
                .map_err(|_| AdapterError::MissingChannelCount {
                    kind: kind.to_string(),
                    param: CHANNEL_COUNT_PARAM,
                })?;
        params.remove(CHANNEL_COUNT_PARAM);

        let models = (0..count)
            .map(|_| C::from_params(&params))
            .collect::<Result<Vec<_>, _>>()?;

        let prefix = format!("{}_", self.controller_kind.name);
        let mut created = Vec::with_capacity(count);
        for model in models {
            let controller_id = entity_eid(&prefix, self.next_index);
            self.next_index += 1;

            let channels: Vec<EntityId> = (0..channel_count)
                .map(|i| channel_eid(&controller_id, &self.channel_kind.name, i))
                .collect();
            for channel in &channels {
                self.channel_owner.insert(channel.clone(), controller_id.clone());
            }
            let children = channels
                .iter()
                .map(|c| EntityDescriptor::leaf(c.clone(), self.channel_kind.name.as_str()))
                .collect();
            created.push(EntityDescriptor::leaf(controller_id.clone(), kind).with_children(children));

            self.order.push(controller_id.clone());
            self.controllers
                .insert(controller_id, ControllerEntry { model, channels });
        }
        debug!(kind, count, channel_count, "created controllers");
        self.lifecycle.enter(Phase::Populated);
        Ok(created)
    }

    fn setup_done(&mut self) -> AdapterResult<()> {
        self.lifecycle.require("setup_done", lifecycle::SETUP_DONE)?;
        self.resolve_topology()?;

        let keys = self.systems.systems().to_vec();
        for id in &self.order {
            if let Some(entry) = self.controllers.get_mut(id) {
                entry.model.initialize_controlled_systems(&keys)?;
                let own = self.systems.systems_on(&entry.channels);
                entry.model.bind_own_systems(&own)?;
            }
        }
        info!(
            sim_id = %self.sim_id,
            controllers = self.order.len(),
            systems = keys.len(),
            "controlled systems initialized"
        );
        self.lifecycle.enter(Phase::Ready);
        Ok(())
    }

    fn step(
        &mut self,
        time: SimTime,
        inputs: &Inputs,
        _max_advance: Option<SimTime>,
    ) -> AdapterResult<SimTime> {
        self.lifecycle.require("step", lifecycle::QUERY)?;
        let phase = self.lifecycle.phase();
        if phase == Phase::Populated && !self.controllers.is_empty() {
            return Err(AdapterError::Lifecycle { op: "step", phase });
        }
        if time < self.time {
            return Err(AdapterError::TimeRegression {
                requested: time,
                current: self.time,
            });
        }

        let grouped = partition(inputs, |eid| self.route(eid))?;
        let plans = grouped
            .iter()
            .map(|(controller_id, controller_inputs)| self.plan_inputs(controller_id, controller_inputs))
            .collect::<AdapterResult<Vec<_>>>()?;
        let next = time
            .checked_add(self.step_size)
            .ok_or(AdapterError::TimeOverflow {
                time,
                advance: self.step_size,
            })?;

        for plan in plans {
            self.apply_plan(plan)?;
        }

        for id in &self.order {
            if let Some(entry) = self.controllers.get_mut(id) {
                entry.model.step(time, self.step_size)?;
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
            let values = if let Some(entry) = self.controllers.get(eid) {
                read_attributes(&self.controller_kind, &entry.model, eid, attrs)?
            } else if let Some(owner) = self.channel_owner.get(eid) {
                let key = self
                    .systems
                    .system_of(eid)
                    .ok_or_else(|| AdapterError::UnconnectedChannel {
                        channel: eid.to_string(),
                    })?;
                let system = self
                    .controllers
                    .get(owner)
                    .and_then(|entry| entry.model.controlled_system(key))
                    .ok_or_else(|| AdapterError::UnknownSystem {
                        controller: owner.to_string(),
                        system: key.to_string(),
                    })?;
                read_attributes(&self.channel_kind, system, eid, attrs)?
            } else {
                return Err(self.unknown_entity(eid));
            };
            data.entities.insert(eid.clone(), values);
        }
        Ok(data)
    }

    fn finalize(&mut self) -> AdapterResult<()> {
        self.lifecycle.require("finalize", lifecycle::FINALIZE)?;
        self.lifecycle.enter(Phase::Finalized);
        info!(
            sim_id = %self.sim_id,
            controllers = self.order.len(),
            "hierarchical adapter finalized"
        );
        Ok(())
    }
}
