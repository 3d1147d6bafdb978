use super::{ThresholdError, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Invalid config '{field}': {source}")]
    InvalidField {
        field: String,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid scenario '{name}': {source}")]
    InvalidScenario {
        name: String,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid threshold '{key}' in scenario '{scenario}': {source}")]
    InvalidThreshold {
        scenario: String,
        key: String,
        #[source]
        source: ThresholdError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
