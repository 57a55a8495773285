//! Schema-checked reads, writes and constructor parameters.

use std::collections::BTreeMap;

use ca_core::{AttrValue, EntityId};
use ca_schema::ModelKindDef;

use crate::error::{AdapterError, AdapterResult};
use crate::model::AttributeAccess;
use crate::params::ModelParams;

/// Every provided parameter must be declared by the kind.
pub(crate) fn check_params(kind: &ModelKindDef, params: &ModelParams) -> AdapterResult<()> {
    match params.names().find(|name| !kind.has_param(name)) {
        Some(param) => Err(AdapterError::UnknownParameter {
            kind: kind.name.clone(),
            param: param.to_string(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_input(kind: &ModelKindDef, entity: &EntityId, attr: &str) -> AdapterResult<()> {
    if kind.accepts_input(attr) {
        Ok(())
    } else {
        Err(AdapterError::UnknownAttribute {
            attr: attr.to_string(),
            entity: entity.to_string(),
        })
    }
}

/// Read `attrs` from `model`. Attributes the model has no value for are omitted.
pub(crate) fn read_attributes<M: AttributeAccess>(
    kind: &ModelKindDef,
    model: &M,
    entity: &EntityId,
    attrs: &[String],
) -> AdapterResult<BTreeMap<String, AttrValue>> {
    let mut values = BTreeMap::new();
    for attr in attrs {
        if !kind.has_attr(attr) {
            return Err(AdapterError::UnknownAttribute {
                attr: attr.clone(),
                entity: entity.to_string(),
            });
        }
        if let Some(value) = model.get_attr(attr)? {
            values.insert(attr.clone(), value);
        }
    }
    Ok(values)
}

pub(crate) fn kind_list(kinds: &[&ModelKindDef]) -> String {
    kinds
        .iter()
        .map(|k| k.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
