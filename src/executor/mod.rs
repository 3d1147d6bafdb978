//! Concurrency strategies that drive iterations of a workload.
//!
//! Two families are supported. VU executors (`constant-vus`, `ramping-vus`)
//! keep a pool of workers that loop iterations back to back. Arrival-rate
//! executors (`constant-arrival-rate`, `ramping-arrival-rate`) start
//! iterations on a clock regardless of how long earlier ones take; when every
//! worker slot is busy the iteration is dropped and counted, never queued.
mod arrival;
mod guard;
mod schedule;
mod spec;
mod vus;

#[cfg(test)]
mod tests;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::MetricsError;
use crate::metrics::{Counter, Gauge, MetricsCollector, TagSet, Trend, names};
use crate::shutdown::ShutdownReceiver;

use guard::IterationGuard;
pub use spec::{
    DEFAULT_GRACEFUL_RAMP_DOWN, DEFAULT_GRACEFUL_STOP, DEFAULT_TIME_UNIT, ExecutorSpec, Stage,
};

/// Lag beyond which an arrival-rate iteration counts as late.
pub const LATE_THRESHOLD: Duration = Duration::from_millis(10);

/// Thirty years: stand-in for "never" when a deadline overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(946_080_000);

/// `from + wait`, clamped to a far-future instant on overflow.
pub(crate) fn deadline_after(from: Instant, wait: Duration) -> Instant {
    from.checked_add(wait)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// Identity handed to each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    /// VU number or arrival-rate worker slot.
    pub worker_id: u64,
    /// Per-VU iteration count for VU executors; global sequence number for
    /// arrival-rate executors.
    pub iteration: u64,
}

/// A unit of work scheduled by an executor. Failures are recorded by the
/// implementation; a panic is caught by the executor and counted.
#[async_trait]
pub trait Iteration: Send + Sync + 'static {
    async fn run(&self, ctx: IterationContext);
}

/// What an executor did, read back from its metric handles when it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorReport {
    pub iterations: u64,
    pub iteration_panics: u64,
    pub iterations_interrupted: u64,
    pub iterations_late: u64,
    pub dropped_iterations: u64,
    pub max_lag: Duration,
    pub peak_vus: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Metric handles shared by every worker of one executor.
pub(crate) struct Instruments {
    iterations: Counter,
    iteration_duration: Trend,
    panics: Counter,
    interrupted: Counter,
    late: Counter,
    dropped: Counter,
    vus: Gauge,
    vus_max: Gauge,
}

impl Instruments {
    fn new(collector: &MetricsCollector, tags: &TagSet) -> Result<Self, MetricsError> {
        Ok(Self {
            iterations: collector.counter(names::ITERATIONS, tags)?,
            iteration_duration: collector.trend(names::ITERATION_DURATION, tags)?,
            panics: collector.counter(names::ITERATION_PANICS, tags)?,
            interrupted: collector.counter(names::ITERATIONS_INTERRUPTED, tags)?,
            late: collector.counter(names::ITERATIONS_LATE, tags)?,
            dropped: collector.counter(names::DROPPED_ITERATIONS, tags)?,
            vus: collector.gauge(names::VUS, tags)?,
            vus_max: collector.gauge(names::VUS_MAX, tags)?,
        })
    }

    fn set_allocated(&self, allocated: usize) {
        self.vus_max
            .set(i64::try_from(allocated).unwrap_or(i64::MAX));
    }
}

/// Runs one iteration with panic isolation and bookkeeping. If the future is
/// dropped mid-iteration (forced stop), only `iterations_interrupted` moves.
pub(crate) async fn run_iteration<I>(iteration: &I, ctx: IterationContext, instruments: &Instruments)
where
    I: Iteration + ?Sized,
{
    let guard = IterationGuard::start(&instruments.interrupted);
    let started = Instant::now();
    let outcome = AssertUnwindSafe(iteration.run(ctx)).catch_unwind().await;
    instruments
        .iteration_duration
        .record_duration(started.elapsed());
    instruments.iterations.inc();
    if outcome.is_err() {
        instruments.panics.inc();
        warn!(
            worker_id = ctx.worker_id,
            iteration = ctx.iteration,
            "Iteration panicked; counted as failed."
        );
    }
    guard.finish();
}

/// A validated executor bound to its metric handles.
pub struct Executor {
    spec: ExecutorSpec,
    instruments: Arc<Instruments>,
}

impl Executor {
    /// Registers the executor's metrics under `tags` (usually the scenario
    /// tag).
    ///
    /// # Errors
    ///
    /// Returns an error if one of the built-in executor metric names is
    /// already registered with a different kind.
    pub fn new(
        spec: ExecutorSpec,
        collector: &MetricsCollector,
        tags: &TagSet,
    ) -> Result<Self, MetricsError> {
        Ok(Self {
            spec,
            instruments: Arc::new(Instruments::new(collector, tags)?),
        })
    }

    #[must_use]
    pub const fn spec(&self) -> &ExecutorSpec {
        &self.spec
    }

    /// Drives `iteration` until the schedule completes or `cancel` fires,
    /// then gives in-flight iterations `graceful_stop` to finish before
    /// aborting them.
    pub async fn run<I>(&self, iteration: Arc<I>, mut cancel: ShutdownReceiver) -> ExecutorReport
    where
        I: Iteration,
    {
        let started = Instant::now();
        info!(
            executor = self.spec.kind(),
            planned_secs = self.spec.planned_duration().as_secs_f64(),
            "Executor starting."
        );
        let instruments = Arc::clone(&self.instruments);
        let outcome = match &self.spec {
            ExecutorSpec::ConstantVus {
                vus,
                duration,
                graceful_stop,
            } => {
                vus::constant(
                    *vus,
                    *duration,
                    *graceful_stop,
                    &iteration,
                    &instruments,
                    &mut cancel,
                )
                .await
            }
            ExecutorSpec::RampingVus {
                start_vus,
                stages,
                graceful_ramp_down,
                graceful_stop,
            } => {
                let plan = vus::RampPlan {
                    start_vus: *start_vus,
                    stages,
                    graceful_ramp_down: *graceful_ramp_down,
                    graceful_stop: *graceful_stop,
                };
                vus::ramping(&plan, &iteration, &instruments, &mut cancel).await
            }
            ExecutorSpec::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                pre_allocated_workers,
                max_workers,
                graceful_stop,
            } => {
                let plan = arrival::ArrivalPlan {
                    profile: schedule::RateProfile::constant(*rate, *time_unit, *duration),
                    pre_allocated_workers: *pre_allocated_workers,
                    max_workers: *max_workers,
                    graceful_stop: *graceful_stop,
                };
                arrival::dispatch(&plan, &iteration, &instruments, &mut cancel).await
            }
            ExecutorSpec::RampingArrivalRate {
                start_rate,
                time_unit,
                stages,
                pre_allocated_workers,
                max_workers,
                graceful_stop,
            } => {
                let plan = arrival::ArrivalPlan {
                    profile: schedule::RateProfile::ramping(
                        *start_rate,
                        stages.clone(),
                        *time_unit,
                    ),
                    pre_allocated_workers: *pre_allocated_workers,
                    max_workers: *max_workers,
                    graceful_stop: *graceful_stop,
                };
                arrival::dispatch(&plan, &iteration, &instruments, &mut cancel).await
            }
        };

        let report = self.report(outcome, started.elapsed());
        info!(
            executor = self.spec.kind(),
            iterations = report.iterations,
            dropped = report.dropped_iterations,
            interrupted = report.iterations_interrupted,
            late = report.iterations_late,
            panics = report.iteration_panics,
            max_lag_ms = u64::try_from(report.max_lag.as_millis()).unwrap_or(u64::MAX),
            cancelled = report.cancelled,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Executor finished."
        );
        report
    }

    fn report(&self, outcome: Outcome, elapsed: Duration) -> ExecutorReport {
        let instruments = &self.instruments;
        ExecutorReport {
            iterations: instruments.iterations.total(),
            iteration_panics: instruments.panics.total(),
            iterations_interrupted: instruments.interrupted.total(),
            iterations_late: instruments.late.total(),
            dropped_iterations: instruments.dropped.total(),
            max_lag: outcome.max_lag,
            peak_vus: u64::try_from(instruments.vus.value().max).unwrap_or(0),
            elapsed,
            cancelled: outcome.cancelled,
        }
    }
}

/// How a scheduling loop ended.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Outcome {
    cancelled: bool,
    max_lag: Duration,
}
