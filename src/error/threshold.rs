use thiserror::Error;

use super::{MetricsError, ValidationError};
use crate::metrics::MetricKind;

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("Threshold expression must not be empty.")]
    EmptyExpression,
    #[error("Threshold '{expr}' has no comparison operator.")]
    MissingOperator { expr: String },
    #[error("Unknown aggregation '{value}'. Use p(N), avg, min, max, med, count, rate or value.")]
    UnknownAggregation { value: String },
    #[error("Percentile '{value}' must be a number in 0..=100.")]
    InvalidPercentile { value: String },
    #[error("Invalid threshold value in '{expr}': {source}")]
    InvalidNumber {
        expr: String,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid metric key '{key}'. Expected name or name{{tag:value,...}}.")]
    InvalidMetricKey { key: String },
    #[error("Aggregation '{aggregation}' does not apply to {kind} metric '{metric}'.")]
    UnsupportedAggregation {
        metric: String,
        kind: MetricKind,
        aggregation: String,
    },
    #[error("Invalid delay_abort_eval for '{key}': {source}")]
    InvalidDelay {
        key: String,
        #[source]
        source: ValidationError,
    },
    #[error("Failed to read metric: {0}")]
    Metrics(#[from] MetricsError),
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
}
