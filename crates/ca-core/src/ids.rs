//! Identifiers exchanged with the orchestration driver.
//!
//! Three string keys travel through an adapter and must not be mixed up:
//! - [`EntityId`]: an entity owned by this adapter instance (`HeatPump_0`)
//! - [`SourceId`]: the sender embedded in an input payload
//! - [`SystemKey`]: a sub-state inside a controller model, known after topology resolution
//!
//! [`FullId`] is the driver-wide name `<sim_id>.<entity_id>`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Entity identifier, unique within one adapter instance and never reused.
    EntityId
}

string_id! {
    /// Identifier of the entity that produced an input value.
    SourceId
}

string_id! {
    /// Key of a controlled system inside a controller model.
    SystemKey
}

impl SystemKey {
    /// Interpret a payload source as a system key.
    ///
    /// Drivers name the entity connected to a channel by its full id, which is
    /// also the source id of every value it sends.
    pub fn from_source(source: &SourceId) -> Self {
        Self(source.as_str().to_string())
    }
}

/// Id of the `index`-th entity created with `prefix`, e.g. `HeatPump_3`.
pub fn entity_eid(prefix: &str, index: usize) -> EntityId {
    EntityId(format!("{prefix}{index}"))
}

/// Id of the `index`-th channel of `controller`, e.g. `DHNetwork_0_HeatExchanger_2`.
pub fn channel_eid(controller: &EntityId, channel_kind: &str, index: usize) -> EntityId {
    EntityId(format!("{controller}_{channel_kind}_{index}"))
}

/// Driver-wide entity name `<sim_id>.<entity_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullId {
    pub sim_id: String,
    pub eid: EntityId,
}

impl FullId {
    pub fn new(sim_id: impl Into<String>, eid: EntityId) -> Self {
        Self {
            sim_id: sim_id.into(),
            eid,
        }
    }

    /// Parse a full id issued for `sim_id`.
    ///
    /// Simulator ids may themselves contain dots, so the known prefix is
    /// stripped instead of splitting at the first dot.
    pub fn parse_for(sim_id: &str, full: &str) -> CoreResult<Self> {
        let eid = full
            .strip_prefix(sim_id)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| CoreError::MalformedId {
                id: full.to_string(),
                reason: "not prefixed with the simulator id",
            })?;
        if eid.is_empty() {
            return Err(CoreError::MalformedId {
                id: full.to_string(),
                reason: "empty entity id",
            });
        }
        Ok(Self::new(sim_id, EntityId::new(eid)))
    }
}

impl fmt::Display for FullId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sim_id, self.eid)
    }
}
