//! Error types for adapter operations.

use ca_schema::{ConfigError, SchemaError};
use thiserror::Error;

use crate::lifecycle::Phase;
use crate::model::ModelError;

/// Errors surfaced to the driver. None of them is retried inside the adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Invalid model name '{requested}', this adapter provides {provided}")]
    InvalidModel { requested: String, provided: String },

    #[error("Cannot instantiate {channel} directly. Create {controller} instead")]
    ChannelCreation { channel: String, controller: String },

    #[error("Unknown parameter '{param}' for model {kind}")]
    UnknownParameter { kind: String, param: String },

    #[error("Model {kind} requires a non-negative integer '{param}'")]
    MissingChannelCount { kind: String, param: &'static str },

    #[error("Unknown attribute '{attr}' for entity {entity}")]
    UnknownAttribute { attr: String, entity: String },

    #[error("The entity ID {id} does not belong to this {kind} adapter")]
    UnknownFlatEntity { id: String, kind: String },

    #[error(
        "The entity ID {id} belongs to neither the controller ({controller_kind}) nor the channel ({channel_kind})"
    )]
    UnknownEntity {
        id: String,
        controller_kind: String,
        channel_kind: String,
    },

    #[error("Controller {controller} has no controlled system '{system}'")]
    UnknownSystem { controller: String, system: String },

    #[error("Channel {channel} is not connected to any system")]
    UnconnectedChannel { channel: String },

    #[error("Topology resolution failed: {message}")]
    TopologyResolution { message: String },

    #[error("Cannot {op} while the adapter is {phase}")]
    Lifecycle { op: &'static str, phase: Phase },

    #[error("Step time {requested} precedes current time {current}")]
    TimeRegression { requested: u64, current: u64 },

    #[error("Advancing {time} by {advance} overflows the simulation clock")]
    TimeOverflow { time: u64, advance: u64 },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Coarse classification of [`AdapterError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidModel,
    UnknownAttribute,
    UnknownEntity,
    UnknownSystem,
    TopologyResolution,
    Lifecycle,
    Model,
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) | Self::Config(_) | Self::Configuration { .. } => {
                ErrorKind::Configuration
            }
            Self::InvalidModel { .. }
            | Self::ChannelCreation { .. }
            | Self::UnknownParameter { .. }
            | Self::MissingChannelCount { .. } => ErrorKind::InvalidModel,
            Self::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            Self::UnknownFlatEntity { .. } | Self::UnknownEntity { .. } => {
                ErrorKind::UnknownEntity
            }
            Self::UnknownSystem { .. } | Self::UnconnectedChannel { .. } => {
                ErrorKind::UnknownSystem
            }
            Self::TopologyResolution { .. } => ErrorKind::TopologyResolution,
            Self::Lifecycle { .. }
            | Self::TimeRegression { .. }
            | Self::TimeOverflow { .. } => ErrorKind::Lifecycle,
            Self::Model(_) => ErrorKind::Model,
        }
    }

    pub(crate) fn topology(message: impl Into<String>) -> Self {
        Self::TopologyResolution {
            message: message.into(),
        }
    }
}
