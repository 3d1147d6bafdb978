use thiserror::Error;

use crate::workload::Price;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL '{url}' is missing host.")]
    UrlMissingHost { url: String },
    #[error("Unknown scenario '{name}'. Available: {available}.")]
    UnknownScenario { name: String, available: String },
    #[error("Executor needs at least one stage.")]
    MissingStages,
    #[error("Stage {index} duration must be > 0.")]
    StageDurationZero { index: usize },
    #[error("Executor duration must be > 0.")]
    ExecutorDurationZero,
    #[error("time_unit must be > 0.")]
    TimeUnitZero,
    #[error("constant-vus needs at least one VU.")]
    ZeroVus,
    #[error("max_workers must be >= 1.")]
    ZeroMaxWorkers,
    #[error("pre_allocated_workers ({pre_allocated}) exceeds max_workers ({max}).")]
    PreAllocatedExceedsMax { pre_allocated: usize, max: usize },
    #[error("Symbol list must not be empty.")]
    EmptySymbols,
    #[error("Account list must not be empty.")]
    EmptyAccounts,
    #[error("Symbol '{symbol}' weight must be > 0.")]
    SymbolWeightZero { symbol: String },
    #[error("Symbol '{symbol}' price range {min}..{max} is invalid; min must be > 0 and < max.")]
    InvalidPriceRange {
        symbol: String,
        min: Price,
        max: Price,
    },
    #[error("Think time range {min_ms}ms..{max_ms}ms is invalid; min must not exceed max.")]
    InvalidThinkTime { min_ms: u64, max_ms: u64 },
    #[error("Invalid decimal number '{value}'.")]
    InvalidDecimal { value: String },
    #[error("Invalid price '{value}'. Use a positive amount with at most two decimals.")]
    InvalidPrice { value: String },
    #[error("Invalid boolean '{value}'. Use true/false, 1/0, yes/no or on/off.")]
    InvalidBoolean { value: String },
    #[error("Invalid run id '{value}'. Use letters, digits or '_'.")]
    InvalidRunId { value: String },
    #[error("Invalid summary trend stat '{value}': {reason}")]
    InvalidTrendStat { value: String, reason: String },
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
