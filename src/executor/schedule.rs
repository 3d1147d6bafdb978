use std::time::Duration;

use super::spec::Stage;

/// Fixed-point factor of arrival rates: a rate of `1_000` is one iteration
/// per time unit.
pub(crate) const RATE_SCALE: u64 = 1_000;

/// Total length of a staged ramp.
pub(crate) fn total_duration(stages: &[Stage]) -> Duration {
    stages
        .iter()
        .fold(Duration::ZERO, |total, stage| total.saturating_add(stage.duration))
}

/// Linearly interpolated target at `elapsed`, ramping from `start` through
/// each stage in order and multiplied by `scale`. Fractions are truncated.
/// `None` once every stage has run out.
pub(crate) fn target_at(start: u64, stages: &[Stage], elapsed: Duration, scale: u64) -> Option<u64> {
    let mut from = start;
    let mut stage_start = Duration::ZERO;
    for stage in stages {
        let stage_end = stage_start.saturating_add(stage.duration);
        if elapsed < stage_end {
            let span = stage.duration.as_nanos();
            let into = elapsed.saturating_sub(stage_start).as_nanos().min(span);
            let weighted = u128::from(from)
                .saturating_mul(span.saturating_sub(into))
                .saturating_add(u128::from(stage.target).saturating_mul(into))
                .saturating_mul(u128::from(scale));
            let target = weighted
                .checked_div(span)
                .unwrap_or_else(|| u128::from(stage.target).saturating_mul(u128::from(scale)));
            return Some(u64::try_from(target).unwrap_or(u64::MAX));
        }
        from = stage.target;
        stage_start = stage_end;
    }
    None
}

/// Whole workers wanted at `elapsed`, truncated toward zero.
pub(crate) fn vus_at(start: u64, stages: &[Stage], elapsed: Duration) -> Option<usize> {
    target_at(start, stages, elapsed, 1).map(|target| usize::try_from(target).unwrap_or(usize::MAX))
}

/// Iteration rate of an arrival-rate executor over time. A constant rate is
/// a single stage that holds its start rate.
#[derive(Debug, Clone)]
pub(crate) struct RateProfile {
    start_rate: u64,
    stages: Vec<Stage>,
    time_unit: Duration,
}

impl RateProfile {
    pub(crate) fn constant(rate: u64, time_unit: Duration, duration: Duration) -> Self {
        Self {
            start_rate: rate,
            stages: vec![Stage::new(duration, rate)],
            time_unit,
        }
    }

    pub(crate) const fn ramping(start_rate: u64, stages: Vec<Stage>, time_unit: Duration) -> Self {
        Self {
            start_rate,
            stages,
            time_unit,
        }
    }

    pub(crate) const fn time_unit(&self) -> Duration {
        self.time_unit
    }

    /// Rate at `elapsed` in thousandths of an iteration per time unit;
    /// `None` past the end.
    pub(crate) fn rate_at(&self, elapsed: Duration) -> Option<u64> {
        target_at(self.start_rate, &self.stages, elapsed, RATE_SCALE)
    }
}
