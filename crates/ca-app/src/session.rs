//! Scripted single-adapter sessions.
//!
//! A script plays the driver's part against one adapter: `init`, a list of
//! `create` calls, `setup_done`, then a sequence of steps, each followed by an
//! output request. Connections the driver would report are given as a static
//! topology table.

use std::path::Path;
use std::sync::Arc;

use ca_adapter::{
    EntityDescriptor, Inputs, ModelParams, OutputData, OutputRequest, RelatedEntities,
    StaticTopology,
};
use ca_core::SimTime;
use ca_schema::AdapterConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::registry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCall {
    #[serde(default = "one")]
    pub count: usize,
    pub kind: String,
    #[serde(default)]
    pub params: ModelParams,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCall {
    pub time: SimTime,
    #[serde(default)]
    pub max_advance: Option<SimTime>,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub outputs: OutputRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScript {
    /// Registry name of the adapter under test.
    pub adapter: String,
    pub config: AdapterConfig,
    pub create: Vec<CreateCall>,
    /// Channel full id → entities the driver reports as connected.
    #[serde(default)]
    pub topology: RelatedEntities,
    #[serde(default)]
    pub steps: Vec<StepCall>,
}

/// One line of session output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time: SimTime,
    pub next_time: SimTime,
    pub outputs: OutputData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub adapter: String,
    pub sim_id: String,
    pub entities: Vec<EntityDescriptor>,
    pub steps: Vec<StepRecord>,
}

pub fn load_script(path: &Path) -> AppResult<SessionScript> {
    let script: SessionScript = ca_schema::load_file(path)?;
    validate_script(&script)?;
    Ok(script)
}

/// Checks that need no adapter instance.
pub fn validate_script(script: &SessionScript) -> AppResult<()> {
    let schema = registry::adapter_schema(&script.adapter)?;
    script.config.check()?;

    if script.create.is_empty() {
        return Err(script_error("at least one create call is required"));
    }
    for (i, call) in script.create.iter().enumerate() {
        if call.count == 0 {
            return Err(script_error(format!("create[{i}]: count must be positive")));
        }
        if schema.model(&call.kind).is_none() {
            return Err(script_error(format!(
                "create[{i}]: adapter '{}' has no model kind '{}'",
                script.adapter, call.kind
            )));
        }
    }

    for pair in script.steps.windows(2) {
        if pair[1].time < pair[0].time {
            return Err(script_error(format!(
                "step times must not decrease ({} after {})",
                pair[1].time, pair[0].time
            )));
        }
    }
    Ok(())
}

fn script_error(what: impl Into<String>) -> AppError {
    AppError::Script { what: what.into() }
}

/// Replay `script` against a fresh adapter.
pub fn run_session(script: &SessionScript) -> AppResult<SessionReport> {
    run_session_with(script, |_| {})
}

/// Like [`run_session`], calling `on_step` as each step completes.
pub fn run_session_with<F>(script: &SessionScript, mut on_step: F) -> AppResult<SessionReport>
where
    F: FnMut(&StepRecord),
{
    validate_script(script)?;

    let mut adapter = registry::build_adapter(&script.adapter)?;
    adapter.connect_driver(Arc::new(StaticTopology::from(script.topology.clone())));
    adapter.init(&script.config)?;
    info!(adapter = %script.adapter, sim_id = %script.config.sim_id, "session started");

    let mut entities = Vec::new();
    for call in &script.create {
        let created = adapter.create(call.count, &call.kind, call.params.clone())?;
        debug!(kind = %call.kind, count = created.len(), "created entities");
        entities.extend(created);
    }
    adapter.setup_done()?;

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, call) in script.steps.iter().enumerate() {
        let next_time = adapter
            .step(call.time, &call.inputs, call.max_advance)
            .map_err(|source| AppError::Step {
                index,
                time: call.time,
                source,
            })?;
        let outputs = adapter
            .get_data(&call.outputs)
            .map_err(|source| AppError::Step {
                index,
                time: call.time,
                source,
            })?;
        let record = StepRecord {
            time: call.time,
            next_time,
            outputs,
        };
        on_step(&record);
        steps.push(record);
    }

    adapter.finalize()?;
    info!(steps = steps.len(), "session finished");

    Ok(SessionReport {
        adapter: script.adapter.clone(),
        sim_id: script.config.sim_id.clone(),
        entities,
        steps,
    })
}
