//! Schema validation logic.

use crate::schema::{AdapterSchema, ModelKindDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{variant} only works for schemas with exactly {expected} model kind(s), {found} were specified")]
    WrongKindCount {
        variant: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Model kind with empty name")]
    EmptyKindName,

    #[error("Duplicate model kind: {name}")]
    DuplicateKind { name: String },

    #[error("Duplicate {what} '{name}' in model kind {kind}")]
    DuplicateName {
        kind: String,
        what: &'static str,
        name: String,
    },

    #[error("Persistent attribute '{attr}' is not declared by model kind {kind}")]
    UndeclaredPersistent { kind: String, attr: String },

    #[error("Attribute '{attr}' of model kind {kind} has no accessor on the model")]
    MissingAccessor { kind: String, attr: String },
}

/// Shape checks every schema must pass, regardless of adapter variant.
pub fn validate_schema(schema: &AdapterSchema) -> Result<(), SchemaError> {
    let mut kinds = HashSet::new();
    for model in &schema.models {
        if model.name.is_empty() {
            return Err(SchemaError::EmptyKindName);
        }
        if !kinds.insert(model.name.as_str()) {
            return Err(SchemaError::DuplicateKind {
                name: model.name.clone(),
            });
        }
        validate_kind(model)?;
    }
    Ok(())
}

fn validate_kind(model: &ModelKindDef) -> Result<(), SchemaError> {
    ensure_unique(model, "parameter", &model.params)?;
    ensure_unique(model, "attribute", &model.attrs)?;

    for attr in &model.persistent {
        if !model.has_attr(attr) {
            return Err(SchemaError::UndeclaredPersistent {
                kind: model.name.clone(),
                attr: attr.clone(),
            });
        }
    }
    Ok(())
}

fn ensure_unique(
    model: &ModelKindDef,
    what: &'static str,
    names: &[String],
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateName {
                kind: model.name.clone(),
                what,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Validate a schema for an adapter variant that needs exactly `expected` kinds.
///
/// Returns the kinds in declaration order.
pub fn validate_arity<'a>(
    schema: &'a AdapterSchema,
    variant: &'static str,
    expected: usize,
) -> Result<&'a [ModelKindDef], SchemaError> {
    validate_schema(schema)?;
    if schema.models.len() != expected {
        return Err(SchemaError::WrongKindCount {
            variant,
            expected,
            found: schema.models.len(),
        });
    }
    Ok(&schema.models)
}

/// Check that every declared attribute is served by the model's accessor table.
pub fn validate_accessors(kind: &ModelKindDef, provided: &[&str]) -> Result<(), SchemaError> {
    for attr in &kind.attrs {
        if !provided.contains(&attr.as_str()) {
            return Err(SchemaError::MissingAccessor {
                kind: kind.name.clone(),
                attr: attr.clone(),
            });
        }
    }
    Ok(())
}
