use crate::metrics::{Counter, Gauge};

/// Counts a live worker in the `vus` gauge for as long as the guard exists.
/// The gauge's own atomic is the count, so readers never see a stale value.
/// Dropped on normal exit and on abort alike.
pub(super) struct ActiveGuard<'gauge> {
    gauge: &'gauge Gauge,
}

impl<'gauge> ActiveGuard<'gauge> {
    pub(super) fn acquire(gauge: &'gauge Gauge) -> Self {
        gauge.increment();
        Self { gauge }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.gauge.decrement();
    }
}

/// Marks an iteration in progress. If the future holding it is dropped
/// before `finish`, the iteration counts as interrupted.
pub(super) struct IterationGuard<'counter> {
    interrupted: &'counter Counter,
    finished: bool,
}

impl<'counter> IterationGuard<'counter> {
    pub(super) const fn start(interrupted: &'counter Counter) -> Self {
        Self {
            interrupted,
            finished: false,
        }
    }

    pub(super) fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.interrupted.inc();
        }
    }
}
