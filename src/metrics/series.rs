use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::MetricsError;

use super::MetricValue;
use super::histogram::TrendHistogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
    Gauge,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic sum.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    total: Arc<AtomicU64>,
}

impl Counter {
    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, value: u64) {
        self.total.fetch_add(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Fraction of boolean observations that were true.
#[derive(Debug, Clone, Default)]
pub struct Rate {
    inner: Arc<RateInner>,
}

#[derive(Debug, Default)]
struct RateInner {
    passes: AtomicU64,
    fails: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateCounts {
    pub passes: u64,
    pub fails: u64,
}

impl RateCounts {
    #[must_use]
    pub const fn total(self) -> u64 {
        self.passes.saturating_add(self.fails)
    }

    /// `passes / total`, or 0 when nothing was observed.
    #[must_use]
    pub fn ratio(self) -> MetricValue {
        MetricValue::ratio(self.passes, self.total())
    }

    /// `ratio` as a percentage.
    #[must_use]
    pub fn percent(self) -> MetricValue {
        MetricValue::scaled_ratio(self.passes, self.total(), 100)
    }

    pub(crate) const fn merge(self, other: RateCounts) -> RateCounts {
        RateCounts {
            passes: self.passes.saturating_add(other.passes),
            fails: self.fails.saturating_add(other.fails),
        }
    }
}

impl Rate {
    pub fn add(&self, observation: bool) {
        if observation {
            self.inner.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.fails.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn counts(&self) -> RateCounts {
        RateCounts {
            passes: self.inner.passes.load(Ordering::Relaxed),
            fails: self.inner.fails.load(Ordering::Relaxed),
        }
    }
}

/// Last written value plus the high-water mark. `increment` and `decrement`
/// move the value in a single atomic step, so concurrent writers never leave
/// a stale reading behind.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

#[derive(Debug, Default)]
struct GaugeInner {
    value: AtomicI64,
    max: AtomicI64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaugeValue {
    pub value: i64,
    pub max: i64,
}

impl Gauge {
    pub fn set(&self, value: i64) {
        self.inner.value.store(value, Ordering::Relaxed);
        self.inner.max.fetch_max(value, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        let raised = self
            .inner
            .value
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        self.inner.max.fetch_max(raised, Ordering::AcqRel);
    }

    /// Never drops below zero.
    pub fn decrement(&self) {
        let lowered = self
            .inner
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1).filter(|next| *next >= 0)
            });
        if lowered.is_err() {
            tracing::debug!("Gauge already at zero; decrement ignored.");
        }
    }

    #[must_use]
    pub fn value(&self) -> GaugeValue {
        GaugeValue {
            value: self.inner.value.load(Ordering::Relaxed),
            max: self.inner.max.load(Ordering::Relaxed),
        }
    }
}

static NEXT_SHARD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_SHARD: usize = NEXT_SHARD.fetch_add(1, Ordering::Relaxed);
}

/// Distribution of values, sharded per thread so concurrent writers rarely
/// contend on the same lock.
#[derive(Debug, Clone)]
pub struct Trend {
    shards: Arc<[Mutex<TrendHistogram>]>,
}

impl Trend {
    pub(crate) fn new(shard_count: usize) -> Result<Self, MetricsError> {
        let mut shards = Vec::with_capacity(shard_count.max(1));
        for _ in 0..shard_count.max(1) {
            shards.push(Mutex::new(TrendHistogram::new()?));
        }
        Ok(Self {
            shards: shards.into(),
        })
    }

    pub fn record_duration(&self, duration: Duration) {
        self.record_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX));
    }

    fn record_micros(&self, micros: u64) {
        let index = THREAD_SHARD
            .with(|shard| *shard)
            .checked_rem(self.shards.len())
            .unwrap_or(0);
        let Some(shard) = self.shards.get(index) else {
            return;
        };
        let mut hist = shard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = hist.record(micros) {
            tracing::warn!("Dropping trend sample: {}", err);
        }
    }

    /// Merge all shards into a single histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if a shard cannot be merged.
    pub fn merged(&self) -> Result<TrendHistogram, MetricsError> {
        let mut merged = TrendHistogram::new()?;
        for shard in self.shards.iter() {
            let hist = shard.lock().unwrap_or_else(PoisonError::into_inner);
            merged.merge(&hist)?;
        }
        Ok(merged)
    }
}
