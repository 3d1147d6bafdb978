use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError, ThresholdError, ValidationError};
use crate::executor::{
    DEFAULT_GRACEFUL_RAMP_DOWN, DEFAULT_GRACEFUL_STOP, DEFAULT_TIME_UNIT, ExecutorSpec, Stage,
};
use crate::scenario::Scenario;
use crate::threshold::Threshold;

use super::apply::parse_trend_stats;
use super::types::{DurationValue, ExecutorConfig, ScenarioConfig, StageConfig, ThresholdConfig};

pub(super) fn build_scenario(name: &str, config: &ScenarioConfig) -> AppResult<Scenario> {
    let invalid = |source: ValidationError| {
        AppError::config(ConfigError::InvalidScenario {
            name: name.to_owned(),
            source,
        })
    };

    let executor = build_executor(&config.executor).map_err(invalid)?;
    executor.validate().map_err(invalid)?;

    let mut thresholds = Vec::with_capacity(config.thresholds.len());
    for (key, threshold) in &config.thresholds {
        thresholds.push(build_threshold(key, threshold).map_err(|err| {
            AppError::config(ConfigError::InvalidThreshold {
                scenario: name.to_owned(),
                key: key.clone(),
                source: err,
            })
        })?);
    }

    let summary_trend_stats = config
        .summary_trend_stats
        .as_deref()
        .map(parse_trend_stats)
        .transpose()
        .map_err(invalid)?;

    Ok(Scenario {
        name: name.to_owned(),
        description: config.description.clone().unwrap_or_default(),
        executor,
        thresholds,
        summary_trend_stats,
    })
}

fn build_threshold(key: &str, config: &ThresholdConfig) -> Result<Threshold, ThresholdError> {
    match config {
        ThresholdConfig::Exprs(exprs) => Threshold::parse(key, exprs),
        ThresholdConfig::Detailed {
            exprs,
            abort_on_fail,
            delay_abort_eval,
        } => {
            let threshold = Threshold::parse(key, exprs)?;
            if !abort_on_fail {
                return Ok(threshold);
            }
            let delay = or_default(delay_abort_eval.as_ref(), Duration::ZERO).map_err(|err| {
                ThresholdError::InvalidDelay {
                    key: key.to_owned(),
                    source: err,
                }
            })?;
            Ok(threshold.with_abort_on_fail(delay))
        }
    }
}

fn build_executor(config: &ExecutorConfig) -> Result<ExecutorSpec, ValidationError> {
    let spec = match config {
        ExecutorConfig::ConstantVus {
            vus,
            duration,
            graceful_stop,
        } => ExecutorSpec::ConstantVus {
            vus: *vus,
            duration: duration.to_duration()?,
            graceful_stop: or_default(graceful_stop.as_ref(), DEFAULT_GRACEFUL_STOP)?,
        },
        ExecutorConfig::RampingVus {
            start_vus,
            stages,
            graceful_ramp_down,
            graceful_stop,
        } => ExecutorSpec::RampingVus {
            start_vus: *start_vus,
            stages: build_stages(stages)?,
            graceful_ramp_down: or_default(graceful_ramp_down.as_ref(), DEFAULT_GRACEFUL_RAMP_DOWN)?,
            graceful_stop: or_default(graceful_stop.as_ref(), DEFAULT_GRACEFUL_STOP)?,
        },
        ExecutorConfig::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_workers,
            max_workers,
            graceful_stop,
        } => ExecutorSpec::ConstantArrivalRate {
            rate: *rate,
            time_unit: or_default(time_unit.as_ref(), DEFAULT_TIME_UNIT)?,
            duration: duration.to_duration()?,
            pre_allocated_workers: *pre_allocated_workers,
            max_workers: *max_workers,
            graceful_stop: or_default(graceful_stop.as_ref(), DEFAULT_GRACEFUL_STOP)?,
        },
        ExecutorConfig::RampingArrivalRate {
            start_rate,
            time_unit,
            stages,
            pre_allocated_workers,
            max_workers,
            graceful_stop,
        } => ExecutorSpec::RampingArrivalRate {
            start_rate: *start_rate,
            time_unit: or_default(time_unit.as_ref(), DEFAULT_TIME_UNIT)?,
            stages: build_stages(stages)?,
            pre_allocated_workers: *pre_allocated_workers,
            max_workers: *max_workers,
            graceful_stop: or_default(graceful_stop.as_ref(), DEFAULT_GRACEFUL_STOP)?,
        },
    };
    Ok(spec)
}

fn build_stages(stages: &[StageConfig]) -> Result<Vec<Stage>, ValidationError> {
    stages
        .iter()
        .map(|stage| Ok(Stage::new(stage.duration.to_duration()?, stage.target)))
        .collect()
}

/// Optional durations accept zero.
fn or_default(value: Option<&DurationValue>, default: Duration) -> Result<Duration, ValidationError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_duration() {
        Err(ValidationError::DurationZero) => Ok(Duration::ZERO),
        other => other,
    }
}
