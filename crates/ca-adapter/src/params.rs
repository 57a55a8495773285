//! Keyword parameters passed to model constructors.

use std::collections::BTreeMap;

use ca_core::{AttrValue, Real};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{ModelError, ModelResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParams(BTreeMap<String, AttrValue>);

impl ModelParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.0.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn required(&self, name: &str) -> ModelResult<&AttrValue> {
        self.get(name).ok_or_else(|| ModelError::MissingParam {
            name: name.to_string(),
        })
    }

    /// Finite number; integers are accepted.
    pub fn real(&self, name: &str) -> ModelResult<Real> {
        let value = self.required(name)?;
        value
            .to_finite_real(name)
            .map_err(|e| invalid(name, e.to_string()))
    }

    pub fn real_or(&self, name: &str, default: Real) -> ModelResult<Real> {
        match self.get(name) {
            Some(_) => self.real(name),
            None => Ok(default),
        }
    }

    /// Non-negative integer.
    pub fn count(&self, name: &str) -> ModelResult<usize> {
        let value = self.required(name)?;
        value
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                invalid(
                    name,
                    format!("expected a non-negative integer, got {value:?}"),
                )
            })
    }

    pub fn text(&self, name: &str) -> ModelResult<&str> {
        let value = self.required(name)?;
        value
            .as_text()
            .ok_or_else(|| invalid(name, format!("expected text, got {}", value.type_name())))
    }

    pub fn datetime(&self, name: &str) -> ModelResult<NaiveDateTime> {
        let text = self.text(name)?;
        parse_timestamp(text).ok_or_else(|| invalid(name, format!("unrecognized timestamp '{text}'")))
    }
}

fn invalid(name: &str, reason: String) -> ModelError {
    ModelError::InvalidParam {
        name: name.to_string(),
        reason,
    }
}

impl FromIterator<(String, AttrValue)> for ModelParams {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse the timestamp spellings found in scenario files and CSV time series.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
