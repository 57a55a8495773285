//! ca-schema: model schemas, their validation, and adapter configuration files.

pub mod config;
pub mod schema;
pub mod validate;

pub use config::AdapterConfig;
pub use schema::*;
pub use validate::{SchemaError, validate_accessors, validate_arity, validate_schema};

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid configuration: {field} ({reason})")]
    Invalid { field: &'static str, reason: String },

    #[error("Unsupported file extension: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Load any serde document from a `.yaml`/`.yml`/`.json` file.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let format = format_of(path)?;
    let content = std::fs::read_to_string(path)?;
    let value = match format {
        Format::Yaml => serde_yaml::from_str(&content)?,
        Format::Json => serde_json::from_str(&content)?,
    };
    Ok(value)
}

pub fn save_file<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    let content = match format_of(path)? {
        Format::Yaml => serde_yaml::to_string(value)?,
        Format::Json => serde_json::to_string_pretty(value)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_config(path: &Path) -> ConfigResult<AdapterConfig> {
    let config: AdapterConfig = load_file(path)?;
    config.check()?;
    Ok(config)
}

pub fn load_schema(path: &Path) -> ConfigResult<AdapterSchema> {
    let schema: AdapterSchema = load_file(path)?;
    validate_schema(&schema)?;
    Ok(schema)
}
