use thiserror::Error;

use super::{ConfigError, MetricsError, SetupError, ThresholdError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("HTTP client error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("Threshold error: {0}")]
    Threshold(#[from] ThresholdError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    #[must_use]
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn setup<E>(error: E) -> Self
    where
        E: Into<SetupError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn metrics<E>(error: E) -> Self
    where
        E: Into<MetricsError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn threshold<E>(error: E) -> Self
    where
        E: Into<ThresholdError>,
    {
        error.into().into()
    }

    /// True for failures that happen before any load is scheduled.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(self, AppError::Setup(_))
    }
}
