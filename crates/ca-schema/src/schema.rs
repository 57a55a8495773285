//! Model schema definitions.
//!
//! The schema is what an adapter hands the driver at `init`: which model kinds
//! it offers, their constructor parameters and their attributes. Kind order is
//! significant (a hierarchical adapter lists its controller first), so kinds
//! are kept in a list rather than a map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SimulatorType {
    #[default]
    TimeBased,
    EventBased,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterSchema {
    #[serde(rename = "type", default)]
    pub kind: SimulatorType,
    #[serde(default)]
    pub models: Vec<ModelKindDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelKindDef {
    pub name: String,
    #[serde(default = "default_public")]
    pub public: bool,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub attrs: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub any_inputs: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistent: Vec<String>,
}

fn default_public() -> bool {
    true
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl AdapterSchema {
    pub fn new(kind: SimulatorType) -> Self {
        Self {
            kind,
            models: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: ModelKindDef) -> Self {
        self.models.push(model);
        self
    }

    pub fn model(&self, name: &str) -> Option<&ModelKindDef> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn kind_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl ModelKindDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
            params: Vec::new(),
            attrs: Vec::new(),
            any_inputs: false,
            persistent: Vec::new(),
        }
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn persistent<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn any_inputs(mut self, any_inputs: bool) -> Self {
        self.any_inputs = any_inputs;
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn has_attr(&self, attr: &str) -> bool {
        self.attrs.iter().any(|a| a == attr)
    }

    pub fn has_param(&self, param: &str) -> bool {
        self.params.iter().any(|p| p == param)
    }

    /// Whether an input for `attr` may be routed to this kind.
    pub fn accepts_input(&self, attr: &str) -> bool {
        self.any_inputs || self.has_attr(attr)
    }
}
