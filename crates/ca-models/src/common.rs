//! Shared helpers for model implementations.

use ca_adapter::{ModelError, ModelResult};
use ca_core::{Real, ensure_finite};

/// Guard a computed output before it is stored on the model.
pub(crate) fn finite(value: Real, what: &str) -> ModelResult<Real> {
    ensure_finite(value, what).map_err(|source| ModelError::InvalidValue {
        attr: what.to_string(),
        source,
    })
}

pub(crate) fn invalid_param(name: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidParam {
        name: name.to_string(),
        reason: reason.into(),
    }
}
