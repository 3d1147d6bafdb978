use std::time::Duration;

use crate::error::ValidationError;

pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);
pub const DEFAULT_GRACEFUL_RAMP_DOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// One leg of a ramp: reach `target` linearly over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    #[must_use]
    pub const fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// How concurrency is scheduled for a scenario.
///
/// VU executors keep a pool of looping workers; arrival-rate executors start
/// iterations on a clock and drop them when every worker slot is busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorSpec {
    ConstantVus {
        vus: u64,
        duration: Duration,
        graceful_stop: Duration,
    },
    RampingVus {
        start_vus: u64,
        stages: Vec<Stage>,
        graceful_ramp_down: Duration,
        graceful_stop: Duration,
    },
    ConstantArrivalRate {
        rate: u64,
        time_unit: Duration,
        duration: Duration,
        pre_allocated_workers: usize,
        max_workers: usize,
        graceful_stop: Duration,
    },
    RampingArrivalRate {
        start_rate: u64,
        time_unit: Duration,
        stages: Vec<Stage>,
        pre_allocated_workers: usize,
        max_workers: usize,
        graceful_stop: Duration,
    },
}

impl ExecutorSpec {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            ExecutorSpec::ConstantVus { .. } => "constant-vus",
            ExecutorSpec::RampingVus { .. } => "ramping-vus",
            ExecutorSpec::ConstantArrivalRate { .. } => "constant-arrival-rate",
            ExecutorSpec::RampingArrivalRate { .. } => "ramping-arrival-rate",
        }
    }

    #[must_use]
    pub const fn graceful_stop(&self) -> Duration {
        match self {
            ExecutorSpec::ConstantVus { graceful_stop, .. }
            | ExecutorSpec::RampingVus { graceful_stop, .. }
            | ExecutorSpec::ConstantArrivalRate { graceful_stop, .. }
            | ExecutorSpec::RampingArrivalRate { graceful_stop, .. } => *graceful_stop,
        }
    }

    /// Scheduled length, excluding graceful stop.
    #[must_use]
    pub fn planned_duration(&self) -> Duration {
        match self {
            ExecutorSpec::ConstantVus { duration, .. }
            | ExecutorSpec::ConstantArrivalRate { duration, .. } => *duration,
            ExecutorSpec::RampingVus { stages, .. }
            | ExecutorSpec::RampingArrivalRate { stages, .. } => {
                super::schedule::total_duration(stages)
            }
        }
    }

    /// Validates structural invariants. Called once when a scenario is
    /// loaded, never on the hot path.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ExecutorSpec::ConstantVus { vus, duration, .. } => {
                if *vus == 0 {
                    return Err(ValidationError::ZeroVus);
                }
                ensure_duration(*duration)
            }
            ExecutorSpec::RampingVus { stages, .. } => validate_stages(stages),
            ExecutorSpec::ConstantArrivalRate {
                time_unit,
                duration,
                pre_allocated_workers,
                max_workers,
                ..
            } => {
                ensure_duration(*duration)?;
                ensure_time_unit(*time_unit)?;
                validate_workers(*pre_allocated_workers, *max_workers)
            }
            ExecutorSpec::RampingArrivalRate {
                time_unit,
                stages,
                pre_allocated_workers,
                max_workers,
                ..
            } => {
                validate_stages(stages)?;
                ensure_time_unit(*time_unit)?;
                validate_workers(*pre_allocated_workers, *max_workers)
            }
        }
    }
}

const fn ensure_duration(duration: Duration) -> Result<(), ValidationError> {
    if duration.is_zero() {
        Err(ValidationError::ExecutorDurationZero)
    } else {
        Ok(())
    }
}

const fn ensure_time_unit(time_unit: Duration) -> Result<(), ValidationError> {
    if time_unit.is_zero() {
        Err(ValidationError::TimeUnitZero)
    } else {
        Ok(())
    }
}

fn validate_stages(stages: &[Stage]) -> Result<(), ValidationError> {
    if stages.is_empty() {
        return Err(ValidationError::MissingStages);
    }
    if let Some(index) = stages.iter().position(|stage| stage.duration.is_zero()) {
        return Err(ValidationError::StageDurationZero { index });
    }
    Ok(())
}

const fn validate_workers(pre_allocated: usize, max: usize) -> Result<(), ValidationError> {
    if max == 0 {
        return Err(ValidationError::ZeroMaxWorkers);
    }
    if pre_allocated > max {
        return Err(ValidationError::PreAllocatedExceedsMax { pre_allocated, max });
    }
    Ok(())
}
