//! Topology resolution through the driver back-channel.
//!
//! Channel ids only say which controller a channel belongs to. Which entity is
//! plugged into a channel is known to the driver alone, and the driver answers
//! asynchronously. Adapter calls are synchronous, so [`block_on_driver`] drives
//! the query to completion on a dedicated bridge thread.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::future::Future;
use std::pin::Pin;

use ca_core::{EntityId, FullId, SystemKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{AdapterError, AdapterResult};

/// Type of an entity as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(rename = "type")]
    pub kind: String,
}

impl RelatedEntity {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Requested full id → (related full id → entity info).
pub type RelatedEntities = BTreeMap<String, BTreeMap<String, RelatedEntity>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Driver connection lost: {message}")]
    Disconnected { message: String },

    #[error("Driver rejected the request: {message}")]
    Rejected { message: String },
}

pub type DriverFuture<T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + Send + 'static>>;

/// Asynchronous queries an adapter may send back to the driver.
pub trait DriverClient: Send + Sync {
    /// Entities connected to each of `full_ids`.
    fn related_entities(&self, full_ids: Vec<String>) -> DriverFuture<RelatedEntities>;
}

/// Driver answers from a fixed connection table.
///
/// Used by scripted sessions, where the connections are part of the script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticTopology {
    links: RelatedEntities,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `other` (of type `kind`) is connected to `full_id`.
    pub fn connect(
        mut self,
        full_id: impl Into<String>,
        other: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        self.links
            .entry(full_id.into())
            .or_default()
            .insert(other.into(), RelatedEntity::new(kind));
        self
    }
}

impl From<RelatedEntities> for StaticTopology {
    fn from(links: RelatedEntities) -> Self {
        Self { links }
    }
}

impl DriverClient for StaticTopology {
    fn related_entities(&self, full_ids: Vec<String>) -> DriverFuture<RelatedEntities> {
        let answer: RelatedEntities = full_ids
            .into_iter()
            .map(|id| {
                let related = self.links.get(&id).cloned().unwrap_or_default();
                (id, related)
            })
            .collect();
        Box::pin(async move { Ok::<_, DriverError>(answer) })
    }
}

/// Run a driver query to completion from synchronous adapter code.
///
/// The future runs on a short-lived current-thread runtime owned by a named
/// worker thread, so this works whether or not the caller is itself inside
/// a runtime. Blocks until the answer arrives.
pub fn block_on_driver<T: Send + 'static>(future: DriverFuture<T>) -> AdapterResult<T> {
    let worker = std::thread::Builder::new()
        .name("topology-bridge".to_string())
        .spawn(move || -> Result<T, String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .map_err(|e| format!("[TopologyBridge] Failed to build Tokio runtime: {e}"))?;
            rt.block_on(future).map_err(|e| e.to_string())
        })
        .map_err(|e| AdapterError::topology(format!("failed to spawn bridge thread: {e}")))?;

    match worker.join() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(message)) => Err(AdapterError::topology(message)),
        Err(_) => Err(AdapterError::topology("bridge thread panicked")),
    }
}

/// Resolved bindings between controlled systems and channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemChannelMap {
    system_to_channel: BTreeMap<SystemKey, EntityId>,
    /// System whose state a channel exposes to `get_data`.
    channel_to_system: BTreeMap<EntityId, SystemKey>,
    /// Systems in channel allocation order.
    order: Vec<SystemKey>,
}

impl SystemChannelMap {
    /// Build the map from the driver's answer for `channels`.
    ///
    /// Every entity related to a channel becomes a system bound to it. A
    /// channel with several related entities exposes the smallest key.
    pub fn from_related(
        sim_id: &str,
        channels: &[EntityId],
        related: &RelatedEntities,
    ) -> AdapterResult<Self> {
        let position: BTreeMap<&EntityId, usize> =
            channels.iter().enumerate().map(|(i, c)| (c, i)).collect();

        let mut map = Self::default();
        let mut bound: Vec<(usize, SystemKey)> = Vec::new();

        for (full, entities) in related {
            let channel = FullId::parse_for(sim_id, full)
                .map_err(|e| AdapterError::topology(e.to_string()))?
                .eid;
            let Some(&pos) = position.get(&channel) else {
                return Err(AdapterError::topology(format!(
                    "driver answered for {full}, which is not a channel of this adapter"
                )));
            };

            for other in entities.keys() {
                let system = SystemKey::new(other.as_str());
                match map.system_to_channel.get(&system) {
                    Some(previous) if previous == &channel => continue,
                    Some(previous) => {
                        return Err(AdapterError::topology(format!(
                            "{system} is connected to both {previous} and {channel}"
                        )));
                    }
                    None => {}
                }
                map.system_to_channel.insert(system.clone(), channel.clone());
                bound.push((pos, system));
            }
        }

        bound.sort();
        for (_, system) in &bound {
            let channel = &map.system_to_channel[system];
            match map.channel_to_system.entry(channel.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(system.clone());
                }
                Entry::Occupied(exposed) => warn!(
                    channel = %channel,
                    exposed = %exposed.get(),
                    hidden = %system,
                    "channel shared by several systems, outputs report the first"
                ),
            }
        }
        map.order = bound.into_iter().map(|(_, system)| system).collect();

        let unconnected = channels
            .iter()
            .filter(|c| !map.channel_to_system.contains_key(*c))
            .count();
        debug!(
            systems = map.order.len(),
            unconnected, "resolved system/channel map"
        );
        Ok(map)
    }

    pub fn channel_of(&self, system: &SystemKey) -> Option<&EntityId> {
        self.system_to_channel.get(system)
    }

    pub fn system_of(&self, channel: &EntityId) -> Option<&SystemKey> {
        self.channel_to_system.get(channel)
    }

    /// System keys in channel allocation order.
    pub fn systems(&self) -> &[SystemKey] {
        &self.order
    }

    /// Systems bound to any of `channels`, in channel allocation order.
    pub fn systems_on(&self, channels: &[EntityId]) -> Vec<SystemKey> {
        self.order
            .iter()
            .filter(|key| {
                self.system_to_channel
                    .get(*key)
                    .is_some_and(|channel| channels.contains(channel))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
