//! Adapter configuration handed over by the driver at `init`.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterConfig {
    pub sim_id: String,
    #[serde(default = "default_step_size")]
    pub step_size: u64,
    #[serde(default = "default_time_resolution")]
    pub time_resolution: f64,
    /// Overrides the `<kind>_` prefix of generated entity ids (flat adapters only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid_prefix: Option<String>,
}

fn default_step_size() -> u64 {
    1
}

fn default_time_resolution() -> f64 {
    1.0
}

impl AdapterConfig {
    pub fn new(sim_id: impl Into<String>, step_size: u64) -> Self {
        Self {
            sim_id: sim_id.into(),
            step_size,
            time_resolution: default_time_resolution(),
            eid_prefix: None,
        }
    }

    pub fn with_eid_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.eid_prefix = Some(prefix.into());
        self
    }

    /// Adapters only run at a time resolution of exactly one tick per second.
    pub fn check(&self) -> ConfigResult<()> {
        if self.time_resolution != 1.0 {
            return Err(ConfigError::Invalid {
                field: "time_resolution",
                reason: format!(
                    "only time_resolution=1.0 is supported, but {} was set",
                    self.time_resolution
                ),
            });
        }
        if self.step_size == 0 {
            return Err(ConfigError::Invalid {
                field: "step_size",
                reason: "must be positive".to_string(),
            });
        }
        if self.sim_id.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sim_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
