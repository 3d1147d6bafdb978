use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use super::guard::ActiveGuard;
use super::schedule::{RateProfile, target_at, total_duration, vus_at};
use super::*;
use crate::error::{AppError, AppResult};
use crate::metrics::{MetricsCollector, TagSet, names};
use crate::shutdown::shutdown_channel;

fn run_paused<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// Sleeps for a fixed time and counts completed calls.
struct Sleeper {
    pause: Duration,
    completed: AtomicU64,
}

impl Sleeper {
    fn new(pause: Duration) -> Arc<Self> {
        Arc::new(Self {
            pause,
            completed: AtomicU64::new(0),
        })
    }

    fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Iteration for Sleeper {
    async fn run(&self, _ctx: IterationContext) {
        sleep(self.pause).await;
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Panics on every even iteration after a short pause.
struct Flaky;

#[async_trait]
impl Iteration for Flaky {
    async fn run(&self, ctx: IterationContext) {
        sleep(Duration::from_millis(500)).await;
        if ctx.iteration % 2 == 0 {
            std::panic::resume_unwind(Box::new(format!("flaky iteration {}", ctx.iteration)));
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

#[test]
fn interpolation_follows_stages() -> AppResult<()> {
    let stages = [Stage::new(secs(30), 10), Stage::new(secs(30), 0)];
    let checks = [(0, 0), (15, 5), (30, 10), (45, 5)];
    for (at, expected) in checks {
        let value = target_at(0, &stages, secs(at), 1)
            .ok_or_else(|| AppError::metrics(format!("no target at {at}s")))?;
        if value != expected {
            return Err(AppError::metrics(format!(
                "target at {at}s was {value}, expected {expected}"
            )));
        }
    }
    if target_at(0, &stages, Duration::from_millis(7_500), 1_000) != Some(2_500) {
        return Err(AppError::metrics("scaled target must keep fractions"));
    }
    if target_at(0, &stages, secs(60), 1).is_some() {
        return Err(AppError::metrics("target reported past the last stage"));
    }
    if total_duration(&stages) != secs(60) {
        return Err(AppError::metrics("total duration mismatch"));
    }
    if vus_at(0, &stages, Duration::from_millis(14_900)) != Some(4) {
        return Err(AppError::metrics("vus target must truncate toward zero"));
    }
    Ok(())
}

#[test]
fn ramping_rate_starts_from_start_rate() -> AppResult<()> {
    let profile = RateProfile::ramping(60, vec![Stage::new(secs(10), 120)], secs(60));
    let at_start = profile.rate_at(Duration::ZERO);
    let halfway = profile.rate_at(secs(5));
    if at_start != Some(60_000) || halfway != Some(90_000) {
        return Err(AppError::metrics(format!(
            "unexpected per-minute rates {at_start:?} / {halfway:?}"
        )));
    }
    let constant = RateProfile::constant(5, secs(1), secs(2));
    if constant.rate_at(secs(1)) != Some(5_000) || constant.rate_at(secs(2)).is_some() {
        return Err(AppError::metrics("constant rate must hold until its duration"));
    }
    Ok(())
}

#[test]
fn active_guards_keep_vus_gauge_exact() -> AppResult<()> {
    let collector = MetricsCollector::new();
    let gauge = collector.gauge(names::VUS, &TagSet::new())?;
    std::thread::scope(|scope| {
        for _ in 0..8 {
            let gauge = &gauge;
            scope.spawn(move || {
                for _ in 0..2_000 {
                    let guard = ActiveGuard::acquire(gauge);
                    drop(guard);
                }
            });
        }
    });
    let vus = collector.gauge_value(names::VUS, &TagSet::new());
    if vus.value != 0 || !(1..=8).contains(&vus.max) {
        return Err(AppError::metrics(format!("unexpected vus gauge {vus:?}")));
    }
    let held = ActiveGuard::acquire(&gauge);
    if collector.gauge_value(names::VUS, &TagSet::new()).value != 1 {
        return Err(AppError::metrics("held guard must read as one VU"));
    }
    drop(held);
    Ok(())
}

#[test]
fn spec_validation_rejects_bad_shapes() -> AppResult<()> {
    let cases = [
        ExecutorSpec::ConstantVus {
            vus: 0,
            duration: secs(1),
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        },
        ExecutorSpec::RampingVus {
            start_vus: 0,
            stages: Vec::new(),
            graceful_ramp_down: DEFAULT_GRACEFUL_RAMP_DOWN,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        },
        ExecutorSpec::RampingVus {
            start_vus: 0,
            stages: vec![Stage::new(secs(1), 5), Stage::new(Duration::ZERO, 5)],
            graceful_ramp_down: DEFAULT_GRACEFUL_RAMP_DOWN,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        },
        ExecutorSpec::ConstantArrivalRate {
            rate: 10,
            time_unit: Duration::ZERO,
            duration: secs(1),
            pre_allocated_workers: 1,
            max_workers: 1,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        },
        ExecutorSpec::RampingArrivalRate {
            start_rate: 1,
            time_unit: DEFAULT_TIME_UNIT,
            stages: vec![Stage::new(secs(1), 5)],
            pre_allocated_workers: 10,
            max_workers: 5,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        },
    ];
    for spec in &cases {
        if spec.validate().is_ok() {
            return Err(AppError::metrics(format!("accepted invalid {spec:?}")));
        }
    }
    Ok(())
}

#[test]
fn constant_vus_loop_back_to_back() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::ConstantVus {
            vus: 3,
            duration: secs(10),
            graceful_stop: secs(5),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(secs(1));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let report = executor.run(Arc::clone(&sleeper), shutdown_rx).await;

        if !(29..=31).contains(&sleeper.completed()) {
            return Err(AppError::metrics(format!(
                "expected ~30 iterations, got {}",
                sleeper.completed()
            )));
        }
        if report.iterations != sleeper.completed() || report.iterations_interrupted != 0 {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        let vus = collector.gauge_value(names::VUS, &TagSet::new());
        if vus.max != 3 || vus.value != 0 {
            return Err(AppError::metrics(format!("unexpected vus gauge {vus:?}")));
        }
        Ok(())
    })
}

#[test]
fn ramping_vus_track_interpolated_target() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::RampingVus {
            start_vus: 0,
            stages: vec![Stage::new(secs(30), 10), Stage::new(secs(30), 0)],
            graceful_ramp_down: secs(10),
            graceful_stop: secs(5),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(secs(2));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        let started = Instant::now();

        let sample = async {
            sleep(Duration::from_millis(15_050)).await;
            collector.gauge_value(names::VUS, &TagSet::new()).value
        };
        let (report, vus_at_15s) = tokio::join!(executor.run(Arc::clone(&sleeper), shutdown_rx), sample);

        if !(4..=5).contains(&vus_at_15s) {
            return Err(AppError::metrics(format!(
                "expected ~5 VUs at 15s, got {vus_at_15s}"
            )));
        }
        let vus = collector.gauge_value(names::VUS, &TagSet::new());
        if vus.value != 0 || !(9..=10).contains(&vus.max) {
            return Err(AppError::metrics(format!("unexpected vus gauge {vus:?}")));
        }
        if started.elapsed() > secs(65) {
            return Err(AppError::metrics(format!(
                "ramp took {:?}",
                started.elapsed()
            )));
        }
        if report.iterations_interrupted != 0 || report.cancelled {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        Ok(())
    })
}

#[test]
fn ramp_down_aborts_after_grace_period() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::RampingVus {
            start_vus: 0,
            stages: vec![Stage::new(secs(1), 2), Stage::new(secs(2), 0)],
            graceful_ramp_down: secs(1),
            graceful_stop: secs(30),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(secs(600));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        let started = Instant::now();

        let report = executor.run(Arc::clone(&sleeper), shutdown_rx).await;

        if report.iterations_interrupted != 2 || report.iterations != 0 {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        if started.elapsed() > secs(5) {
            return Err(AppError::metrics(format!(
                "ramp-down waited {:?}",
                started.elapsed()
            )));
        }
        Ok(())
    })
}

#[test]
fn arrival_rate_drops_when_workers_saturated() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::ConstantArrivalRate {
            rate: 10,
            time_unit: secs(1),
            duration: secs(2),
            pre_allocated_workers: 1,
            max_workers: 2,
            graceful_stop: secs(30),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(secs(1));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let report = executor.run(Arc::clone(&sleeper), shutdown_rx).await;

        let dropped = collector.counter_total(names::DROPPED_ITERATIONS, &TagSet::new());
        if dropped == 0 || dropped != report.dropped_iterations {
            return Err(AppError::metrics(format!("unexpected dropped count {dropped}")));
        }
        if sleeper.completed().saturating_add(dropped) != 20 {
            return Err(AppError::metrics(format!(
                "{} completed + {dropped} dropped != 20 scheduled",
                sleeper.completed()
            )));
        }
        let vus_max = collector.gauge_value(names::VUS_MAX, &TagSet::new());
        if vus_max.max != 2 {
            return Err(AppError::metrics(format!("unexpected vus_max {vus_max:?}")));
        }
        let vus = collector.gauge_value(names::VUS, &TagSet::new());
        if vus.max > 2 {
            return Err(AppError::metrics(format!("worker ceiling exceeded {vus:?}")));
        }
        Ok(())
    })
}

#[test]
fn arrival_rate_is_exact_with_spare_workers() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::ConstantArrivalRate {
            rate: 50,
            time_unit: secs(1),
            duration: secs(4),
            pre_allocated_workers: 5,
            max_workers: 20,
            graceful_stop: secs(5),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(Duration::from_millis(50));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let report = executor.run(Arc::clone(&sleeper), shutdown_rx).await;

        if sleeper.completed() != 200 || report.dropped_iterations != 0 {
            return Err(AppError::metrics(format!(
                "expected 200 iterations, got {} (report {report:?})",
                sleeper.completed()
            )));
        }
        if report.iterations_late != 0 {
            return Err(AppError::metrics(format!("unexpected lag {report:?}")));
        }
        Ok(())
    })
}

#[test]
fn zero_rate_stage_idles_dispatcher() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::RampingArrivalRate {
            start_rate: 0,
            time_unit: secs(1),
            stages: vec![Stage::new(secs(2), 0), Stage::new(secs(2), 10)],
            pre_allocated_workers: 2,
            max_workers: 10,
            graceful_stop: secs(5),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(Duration::from_millis(10));
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let sample = async {
            sleep(Duration::from_millis(1_950)).await;
            sleeper.completed()
        };
        let (report, during_idle) = tokio::join!(executor.run(Arc::clone(&sleeper), shutdown_rx), sample);

        if during_idle != 0 {
            return Err(AppError::metrics(format!(
                "{during_idle} iterations during a zero-rate stage"
            )));
        }
        // average of 5/s over the second stage
        if !(8..=11).contains(&report.iterations) {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        Ok(())
    })
}

#[test]
fn panicking_iterations_are_isolated() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::ConstantVus {
            vus: 1,
            duration: secs(3),
            graceful_stop: secs(1),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let report = executor.run(Arc::new(Flaky), shutdown_rx).await;

        if report.iterations != 6 || report.iteration_panics != 3 {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        Ok(())
    })
}

#[test]
fn cancellation_applies_graceful_stop() -> AppResult<()> {
    run_paused(async {
        let collector = MetricsCollector::new();
        let spec = ExecutorSpec::ConstantVus {
            vus: 2,
            duration: secs(3_600),
            graceful_stop: secs(2),
        };
        let executor = Executor::new(spec, &collector, &TagSet::new())?;
        let sleeper = Sleeper::new(secs(10));
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let started = Instant::now();

        let trigger = async {
            sleep(secs(5)).await;
            drop(shutdown_tx.send(()));
        };
        let (report, ()) = tokio::join!(executor.run(Arc::clone(&sleeper), shutdown_rx), trigger);

        if !report.cancelled || report.iterations_interrupted != 2 {
            return Err(AppError::metrics(format!("unexpected report {report:?}")));
        }
        if started.elapsed() > secs(8) {
            return Err(AppError::metrics(format!(
                "cancellation took {:?}",
                started.elapsed()
            )));
        }
        Ok(())
    })
}
