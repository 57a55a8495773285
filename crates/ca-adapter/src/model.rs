//! Contract between adapters and the domain models they wrap.
//!
//! Adapters never know a model's concrete fields. They go through
//! [`AttributeAccess`] for reads and writes, [`DomainModel::step`] to advance
//! time, and [`FromParams`] to build instances from driver parameters.
//! Controller models additionally own keyed sub-states ([`ControllerModel`]).

use std::path::PathBuf;

use ca_core::{AttrValue, CoreError, Real, SimTime, SystemKey};
use thiserror::Error;

use crate::params::ModelParams;

/// Errors raised by domain models. Adapters propagate them unchanged.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model {model} has no attribute '{attr}'")]
    NoSuchAttribute { model: &'static str, attr: String },

    #[error("Attribute '{attr}' of model {model} is read-only")]
    ReadOnly { model: &'static str, attr: String },

    #[error("Invalid value for attribute '{attr}': {source}")]
    InvalidValue {
        attr: String,
        #[source]
        source: CoreError,
    },

    #[error("Missing constructor parameter '{name}'")]
    MissingParam { name: String },

    #[error("Invalid constructor parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model data: {what}")]
    Data { what: String },

    #[error("Controller has no controlled system '{key}'")]
    NoSuchSystem { key: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

/// A single attribute slot on a model struct.
///
/// `Option` fields read as "no value" while unset; the adapter omits them
/// from output maps.
pub trait AttrField {
    fn read(&self) -> Option<AttrValue>;
    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()>;
}

fn mismatch(attr: &str, expected: &'static str, found: &AttrValue) -> ModelError {
    ModelError::InvalidValue {
        attr: attr.to_string(),
        source: CoreError::TypeMismatch {
            what: attr.to_string(),
            expected,
            found: found.type_name(),
        },
    }
}

impl AttrField for Real {
    fn read(&self) -> Option<AttrValue> {
        Some(AttrValue::Float(*self))
    }

    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        *self = value
            .to_finite_real(attr)
            .map_err(|source| ModelError::InvalidValue {
                attr: attr.to_string(),
                source,
            })?;
        Ok(())
    }
}

impl AttrField for i64 {
    fn read(&self) -> Option<AttrValue> {
        Some(AttrValue::Int(*self))
    }

    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        *self = value
            .as_int()
            .ok_or_else(|| mismatch(attr, "integer", &value))?;
        Ok(())
    }
}

impl AttrField for bool {
    fn read(&self) -> Option<AttrValue> {
        Some(AttrValue::Bool(*self))
    }

    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        *self = value.as_bool().ok_or_else(|| mismatch(attr, "bool", &value))?;
        Ok(())
    }
}

impl AttrField for String {
    fn read(&self) -> Option<AttrValue> {
        Some(AttrValue::Text(self.clone()))
    }

    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        match value {
            AttrValue::Text(text) => {
                *self = text;
                Ok(())
            }
            other => Err(mismatch(attr, "text", &other)),
        }
    }
}

impl<T: AttrField + Default> AttrField for Option<T> {
    fn read(&self) -> Option<AttrValue> {
        self.as_ref().and_then(AttrField::read)
    }

    fn write(&mut self, attr: &str, value: AttrValue) -> ModelResult<()> {
        let mut inner = T::default();
        inner.write(attr, value)?;
        *self = Some(inner);
        Ok(())
    }
}

/// Name-based access to a model's attributes.
///
/// Usually generated with [`model_attributes!`](crate::model_attributes).
pub trait AttributeAccess {
    /// Every attribute name served by `get_attr`.
    const ATTRIBUTES: &'static [&'static str];

    /// Current value of `attr`, `None` while the model has no value for it.
    fn get_attr(&self, attr: &str) -> ModelResult<Option<AttrValue>>;

    fn set_attr(&mut self, attr: &str, value: AttrValue) -> ModelResult<()>;
}

/// A model that advances in fixed time steps.
pub trait DomainModel: AttributeAccess {
    /// Advance the model to `time`. `step_size` is the adapter's step in ticks.
    fn step(&mut self, time: SimTime, step_size: SimTime) -> ModelResult<()>;
}

/// Construction from the driver's keyword parameters.
pub trait FromParams: Sized {
    fn from_params(params: &ModelParams) -> ModelResult<Self>;
}

/// A model that manages several controlled systems, one per connected entity.
///
/// The hierarchical adapter exposes each system through a channel entity.
pub trait ControllerModel: DomainModel + FromParams {
    type System: AttributeAccess;

    /// Called once after topology resolution, with keys in channel order.
    fn initialize_controlled_systems(&mut self, keys: &[SystemKey]) -> ModelResult<()>;

    /// Called right after [`initialize_controlled_systems`](Self::initialize_controlled_systems)
    /// with the keys connected to this controller's own channels, in channel order.
    fn bind_own_systems(&mut self, _keys: &[SystemKey]) -> ModelResult<()> {
        Ok(())
    }

    fn controlled_system(&self, key: &SystemKey) -> Option<&Self::System>;

    fn controlled_system_mut(&mut self, key: &SystemKey) -> Option<&mut Self::System>;
}

/// Implements [`AttributeAccess`] for a struct from a list of its fields.
///
/// ```ignore
/// model_attributes!(HeatPump { heat_demand, tank_temperature });
/// ```
#[macro_export]
macro_rules! model_attributes {
    ($model:ident { $($field:ident),* $(,)? }) => {
        impl $crate::model::AttributeAccess for $model {
            const ATTRIBUTES: &'static [&'static str] = &[$(stringify!($field)),*];

            fn get_attr(
                &self,
                attr: &str,
            ) -> $crate::model::ModelResult<Option<$crate::AttrValue>> {
                match attr {
                    $(stringify!($field) => Ok($crate::model::AttrField::read(&self.$field)),)*
                    _ => Err($crate::model::ModelError::NoSuchAttribute {
                        model: stringify!($model),
                        attr: attr.to_string(),
                    }),
                }
            }

            fn set_attr(
                &mut self,
                attr: &str,
                value: $crate::AttrValue,
            ) -> $crate::model::ModelResult<()> {
                match attr {
                    $(stringify!($field) => $crate::model::AttrField::write(&mut self.$field, attr, value),)*
                    _ => Err($crate::model::ModelError::NoSuchAttribute {
                        model: stringify!($model),
                        attr: attr.to_string(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tank {
        level: Real,
        label: String,
        setpoint: Option<Real>,
        alarms: i64,
        open: bool,
    }

    crate::model_attributes!(Tank {
        level,
        label,
        setpoint,
        alarms,
        open
    });

    #[test]
    fn lists_attributes() {
        assert_eq!(
            Tank::ATTRIBUTES,
            &["level", "label", "setpoint", "alarms", "open"]
        );
    }

    #[test]
    fn read_write_roundtrip() {
        let mut tank = Tank::default();
        tank.set_attr("level", AttrValue::Int(3)).unwrap();
        tank.set_attr("label", "north".into()).unwrap();
        tank.set_attr("open", true.into()).unwrap();

        assert_eq!(tank.level, 3.0);
        assert_eq!(tank.get_attr("label").unwrap(), Some("north".into()));
        assert_eq!(tank.get_attr("open").unwrap(), Some(AttrValue::Bool(true)));
    }

    #[test]
    fn unset_option_reads_none() {
        let mut tank = Tank::default();
        assert_eq!(tank.get_attr("setpoint").unwrap(), None);
        tank.set_attr("setpoint", 45.0.into()).unwrap();
        assert_eq!(tank.get_attr("setpoint").unwrap(), Some(45.0.into()));
    }

    #[test]
    fn unknown_attribute() {
        let tank = Tank::default();
        let err = tank.get_attr("volume").unwrap_err();
        assert!(matches!(
            err,
            ModelError::NoSuchAttribute { model: "Tank", .. }
        ));
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut tank = Tank::default();
        assert!(tank.set_attr("alarms", 1.5.into()).is_err());
        assert!(tank.set_attr("level", "high".into()).is_err());
        assert!(tank.set_attr("level", f64::NAN.into()).is_err());
        assert_eq!(tank.alarms, 0);
    }
}
