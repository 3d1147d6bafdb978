use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Semaphore, TryAcquireError};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, warn};

use super::guard::ActiveGuard;
use super::schedule::{RATE_SCALE, RateProfile};
use super::{
    Instruments, Iteration, IterationContext, LATE_THRESHOLD, Outcome, deadline_after,
    run_iteration,
};
use crate::shutdown::{ShutdownReceiver, wait_for_shutdown};

/// Longest the dispatcher sleeps before re-reading the rate.
const RATE_TICK: Duration = Duration::from_millis(100);

pub(super) struct ArrivalPlan {
    pub(super) profile: RateProfile,
    pub(super) pre_allocated_workers: usize,
    pub(super) max_workers: usize,
    pub(super) graceful_stop: Duration,
}

/// Worker slot IDs. Pre-allocated slots exist up front; further slots are
/// created on demand. The semaphore in front of the pool keeps the total at
/// or below `max_workers`.
struct SlotPool {
    free: Mutex<Vec<u64>>,
    allocated: AtomicUsize,
}

impl SlotPool {
    fn new(pre_allocated: usize) -> Self {
        let free = (0..u64::try_from(pre_allocated).unwrap_or(u64::MAX))
            .rev()
            .collect();
        Self {
            free: Mutex::new(free),
            allocated: AtomicUsize::new(pre_allocated),
        }
    }

    fn checkout(&self) -> u64 {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        reused.unwrap_or_else(|| {
            let id = self.allocated.fetch_add(1, Ordering::Relaxed);
            u64::try_from(id).unwrap_or(u64::MAX)
        })
    }

    fn checkin(&self, id: u64) {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }

    fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

struct SlotGuard {
    pool: Arc<SlotPool>,
    id: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.pool.checkin(self.id);
    }
}

/// Sleeps until `deadline`; true when cancellation fired first.
async fn wait_until(deadline: Instant, cancel: &mut ShutdownReceiver) -> bool {
    tokio::select! {
        () = sleep_until(deadline) => false,
        () = wait_for_shutdown(cancel) => true,
    }
}

/// Arrival-rate dispatcher.
///
/// Start times are computed on an absolute timeline in integer nanoseconds.
/// One iteration is due once `progress` reaches `time_unit * RATE_SCALE`;
/// each nanosecond adds the current fixed-point rate. Partial progress
/// carries across rate changes in `RATE_TICK` steps, so a zero or very low
/// rate simply idles. Each start needs a permit from a semaphore
/// sized `max_workers`; with none available the iteration is dropped.
pub(super) async fn dispatch<I>(
    plan: &ArrivalPlan,
    iteration: &Arc<I>,
    instruments: &Arc<Instruments>,
    cancel: &mut ShutdownReceiver,
) -> Outcome
where
    I: Iteration,
{
    let permits = Arc::new(Semaphore::new(plan.max_workers));
    let slots = Arc::new(SlotPool::new(plan.pre_allocated_workers));
    instruments.set_allocated(slots.allocated());

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    let mut next = start;
    let due = plan
        .profile
        .time_unit()
        .as_nanos()
        .saturating_mul(u128::from(RATE_SCALE))
        .max(1);
    let tick_nanos = RATE_TICK.as_nanos();
    let mut progress = due;
    let mut sequence = 0_u64;
    let mut max_lag = Duration::ZERO;

    let cancelled = loop {
        let Some(rate) = plan.profile.rate_at(next.saturating_duration_since(start)) else {
            break false;
        };
        // Nanoseconds until the next start, rounded up; `None` idles a tick.
        let gap = due
            .saturating_sub(progress)
            .saturating_add(u128::from(rate).saturating_sub(1))
            .checked_div(u128::from(rate))
            .filter(|gap| *gap <= tick_nanos);
        let Some(gap) = gap else {
            progress = progress.saturating_add(u128::from(rate).saturating_mul(tick_nanos));
            next = deadline_after(next, RATE_TICK);
            if wait_until(next, cancel).await {
                break true;
            }
            continue;
        };

        next = deadline_after(next, Duration::from_nanos(u64::try_from(gap).unwrap_or(u64::MAX)));
        progress = 0;
        if plan
            .profile
            .rate_at(next.saturating_duration_since(start))
            .is_none()
        {
            break false;
        }
        if wait_until(next, cancel).await {
            break true;
        }

        let lag = Instant::now().saturating_duration_since(next);
        if lag > LATE_THRESHOLD {
            instruments.late.inc();
            max_lag = max_lag.max(lag);
        }

        match Arc::clone(&permits).try_acquire_owned() {
            Ok(permit) => {
                let slot = SlotGuard {
                    pool: Arc::clone(&slots),
                    id: slots.checkout(),
                };
                instruments.set_allocated(slots.allocated());
                let ctx = IterationContext {
                    worker_id: slot.id,
                    iteration: sequence,
                };
                let iteration = Arc::clone(iteration);
                let instruments = Arc::clone(instruments);
                tasks.spawn(async move {
                    let _permit = permit;
                    let _slot = slot;
                    let _active = ActiveGuard::acquire(&instruments.vus);
                    run_iteration(iteration.as_ref(), ctx, &instruments).await;
                });
            }
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => {
                instruments.dropped.inc();
                debug!(sequence, "All workers busy; iteration dropped.");
            }
        }
        sequence = sequence.saturating_add(1);

        while let Some(joined) = tasks.try_join_next() {
            log_join_failure(&joined);
        }
    };

    let stop_deadline = deadline_after(Instant::now(), plan.graceful_stop);
    loop {
        match timeout_at(stop_deadline, tasks.join_next()).await {
            Ok(Some(joined)) => log_join_failure(&joined),
            Ok(None) => break,
            Err(_elapsed) => {
                debug!(
                    in_flight = tasks.len(),
                    "Graceful stop over; aborting iterations."
                );
                tasks.abort_all();
                while let Some(joined) = tasks.join_next().await {
                    log_join_failure(&joined);
                }
                break;
            }
        }
    }

    Outcome { cancelled, max_lag }
}

fn log_join_failure(joined: &Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined
        && !err.is_cancelled()
    {
        warn!("Iteration task failed: {}", err);
    }
}
