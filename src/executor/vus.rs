use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until, timeout_at};
use tracing::{debug, warn};

use super::guard::ActiveGuard;
use super::schedule::vus_at;
use super::spec::Stage;
use super::{Instruments, Iteration, IterationContext, Outcome, deadline_after, run_iteration};
use crate::shutdown::{ShutdownReceiver, wait_for_shutdown};

/// Control loop period for ramping VUs.
pub(super) const CONTROL_TICK: Duration = Duration::from_millis(100);

struct Vu {
    id: u64,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Vu {
    fn spawn<I>(
        id: u64,
        iteration: &Arc<I>,
        instruments: &Arc<Instruments>,
        deadline: Option<Instant>,
    ) -> Self
    where
        I: Iteration,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let iteration = Arc::clone(iteration);
        let instruments = Arc::clone(instruments);
        let handle = tokio::spawn(async move {
            let _active = ActiveGuard::acquire(&instruments.vus);
            let mut count = 0_u64;
            loop {
                if stop_flag.load(Ordering::Acquire) {
                    break;
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    break;
                }
                let ctx = IterationContext {
                    worker_id: id,
                    iteration: count,
                };
                run_iteration(iteration.as_ref(), ctx, &instruments).await;
                count = count.saturating_add(1);
            }
        });
        Self { id, stop, handle }
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Asks every VU to stop, waits for each until its deadline, then aborts
/// whatever is still running.
async fn drain(vus: Vec<(Vu, Instant)>) {
    for (vu, _) in &vus {
        vu.request_stop();
    }
    for (mut vu, deadline) in vus {
        let joined = match timeout_at(deadline, &mut vu.handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                debug!(vu = vu.id, "Graceful period over; aborting VU.");
                vu.handle.abort();
                (&mut vu.handle).await
            }
        };
        if let Err(err) = joined
            && !err.is_cancelled()
        {
            warn!(vu = vu.id, "VU task failed: {}", err);
        }
    }
}

pub(super) async fn constant<I>(
    vus: u64,
    duration: Duration,
    graceful_stop: Duration,
    iteration: &Arc<I>,
    instruments: &Arc<Instruments>,
    cancel: &mut ShutdownReceiver,
) -> Outcome
where
    I: Iteration,
{
    let deadline = deadline_after(Instant::now(), duration);
    instruments.set_allocated(usize::try_from(vus).unwrap_or(usize::MAX));
    let pool: Vec<Vu> = (0..vus)
        .map(|id| Vu::spawn(id, iteration, instruments, Some(deadline)))
        .collect();

    let cancelled = tokio::select! {
        () = sleep_until(deadline) => false,
        () = wait_for_shutdown(cancel) => true,
    };

    let stop_deadline = deadline_after(Instant::now(), graceful_stop);
    drain(pool.into_iter().map(|vu| (vu, stop_deadline)).collect()).await;
    Outcome {
        cancelled,
        ..Outcome::default()
    }
}

pub(super) struct RampPlan<'stages> {
    pub(super) start_vus: u64,
    pub(super) stages: &'stages [Stage],
    pub(super) graceful_ramp_down: Duration,
    pub(super) graceful_stop: Duration,
}

/// Ramping VUs: every control tick the interpolated target is compared with
/// the live pool. Surplus VUs (newest first) are asked to stop after their
/// current iteration and aborted if still busy after `graceful_ramp_down`.
pub(super) async fn ramping<I>(
    plan: &RampPlan<'_>,
    iteration: &Arc<I>,
    instruments: &Arc<Instruments>,
    cancel: &mut ShutdownReceiver,
) -> Outcome
where
    I: Iteration,
{
    let start = Instant::now();
    let mut active: Vec<Vu> = Vec::new();
    let mut retiring: Vec<(Vu, Instant)> = Vec::new();
    let mut next_id = 0_u64;
    let mut allocated = 0_usize;
    let mut ticker = interval(CONTROL_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let cancelled = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = wait_for_shutdown(cancel) => break true,
        }
        let now = Instant::now();
        let Some(target) = vus_at(plan.start_vus, plan.stages, now.saturating_duration_since(start))
        else {
            break false;
        };

        while active.len() < target {
            active.push(Vu::spawn(next_id, iteration, instruments, None));
            next_id = next_id.saturating_add(1);
        }
        while active.len() > target {
            let Some(vu) = active.pop() else {
                break;
            };
            vu.request_stop();
            retiring.push((vu, deadline_after(now, plan.graceful_ramp_down)));
        }

        retiring.retain(|(vu, deadline)| {
            if vu.handle.is_finished() {
                return false;
            }
            if now >= *deadline {
                debug!(vu = vu.id, "Ramp-down period over; aborting VU.");
                vu.handle.abort();
                return false;
            }
            true
        });

        let live = active.len().saturating_add(retiring.len());
        if live > allocated {
            allocated = live;
            instruments.set_allocated(allocated);
        }
    };

    let stop_deadline = deadline_after(Instant::now(), plan.graceful_stop);
    let mut remaining: Vec<(Vu, Instant)> = active
        .into_iter()
        .map(|vu| (vu, stop_deadline))
        .collect();
    remaining.extend(
        retiring
            .into_iter()
            .map(|(vu, deadline)| (vu, deadline.min(stop_deadline))),
    );
    remaining.sort_by_key(|(_, deadline)| *deadline);
    drain(remaining).await;
    Outcome {
        cancelled,
        ..Outcome::default()
    }
}
