use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ValidationError;
use crate::workload::SymbolProfile;

/// Contents of `orderload.toml` / `orderload.json`. Every field is optional;
/// CLI flags win over file values.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub debug: Option<bool>,
    pub scenario: Option<String>,
    pub seed: Option<u64>,
    pub run_id: Option<String>,
    pub request_timeout: Option<DurationValue>,
    pub threshold_interval: Option<DurationValue>,
    pub think_time: Option<ThinkTimeConfig>,
    pub summary_trend_stats: Option<Vec<String>>,
    pub symbols: Option<Vec<SymbolProfile>>,
    pub accounts: Option<Vec<String>>,
    pub scenarios: Option<BTreeMap<String, ScenarioConfig>>,
}

/// Pause between iterations, in milliseconds. `0..0` disables it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThinkTimeConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub description: Option<String>,
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdConfig>,
    pub summary_trend_stats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutorConfig {
    ConstantVus {
        vus: u64,
        duration: DurationValue,
        graceful_stop: Option<DurationValue>,
    },
    RampingVus {
        #[serde(default)]
        start_vus: u64,
        stages: Vec<StageConfig>,
        graceful_ramp_down: Option<DurationValue>,
        graceful_stop: Option<DurationValue>,
    },
    ConstantArrivalRate {
        rate: u64,
        time_unit: Option<DurationValue>,
        duration: DurationValue,
        pre_allocated_workers: usize,
        max_workers: usize,
        graceful_stop: Option<DurationValue>,
    },
    RampingArrivalRate {
        #[serde(default)]
        start_rate: u64,
        time_unit: Option<DurationValue>,
        stages: Vec<StageConfig>,
        pre_allocated_workers: usize,
        max_workers: usize,
        graceful_stop: Option<DurationValue>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub duration: DurationValue,
    pub target: u64,
}

/// Either a bare list of expressions or the long form with abort options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdConfig {
    Exprs(Vec<String>),
    Detailed {
        exprs: Vec<String>,
        #[serde(default)]
        abort_on_fail: bool,
        delay_abort_eval: Option<DurationValue>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }
}
