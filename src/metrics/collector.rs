use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::MetricsError;

use super::series::{Counter, Gauge, GaugeValue, MetricKind, Rate, RateCounts, Trend};
use super::summary::TrendSnapshot;
use super::{TagSet, TrendHistogram};

const MAX_TREND_SHARDS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    name: String,
    tags: TagSet,
}

#[derive(Debug, Clone)]
enum SeriesHandle {
    Counter(Counter),
    Rate(Rate),
    Trend(Trend),
    Gauge(Gauge),
}

impl SeriesHandle {
    const fn kind(&self) -> MetricKind {
        match self {
            SeriesHandle::Counter(_) => MetricKind::Counter,
            SeriesHandle::Rate(_) => MetricKind::Rate,
            SeriesHandle::Trend(_) => MetricKind::Trend,
            SeriesHandle::Gauge(_) => MetricKind::Gauge,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    kinds: HashMap<String, MetricKind>,
    series: HashMap<SeriesKey, SeriesHandle>,
}

/// One series as seen by [`MetricsCollector::series`].
#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    pub name: String,
    pub tags: TagSet,
    pub kind: MetricKind,
}

/// Thread-safe metric registry shared by every worker of a run.
#[derive(Debug)]
pub struct MetricsCollector {
    registry: RwLock<Registry>,
    trend_shards: usize,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        let trend_shards = std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .min(MAX_TREND_SHARDS);
        Self {
            registry: RwLock::new(Registry::default()),
            trend_shards,
        }
    }

    /// Counter handle for `name` + `tags`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered with another kind.
    pub fn counter(&self, name: &str, tags: &TagSet) -> Result<Counter, MetricsError> {
        match self.resolve(name, tags, MetricKind::Counter)? {
            SeriesHandle::Counter(counter) => Ok(counter),
            other => Err(conflict(name, other.kind(), MetricKind::Counter)),
        }
    }

    /// Rate handle for `name` + `tags`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered with another kind.
    pub fn rate(&self, name: &str, tags: &TagSet) -> Result<Rate, MetricsError> {
        match self.resolve(name, tags, MetricKind::Rate)? {
            SeriesHandle::Rate(rate) => Ok(rate),
            other => Err(conflict(name, other.kind(), MetricKind::Rate)),
        }
    }

    /// Trend handle for `name` + `tags`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered with another kind or
    /// the histogram cannot be allocated.
    pub fn trend(&self, name: &str, tags: &TagSet) -> Result<Trend, MetricsError> {
        match self.resolve(name, tags, MetricKind::Trend)? {
            SeriesHandle::Trend(trend) => Ok(trend),
            other => Err(conflict(name, other.kind(), MetricKind::Trend)),
        }
    }

    /// Gauge handle for `name` + `tags`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered with another kind.
    pub fn gauge(&self, name: &str, tags: &TagSet) -> Result<Gauge, MetricsError> {
        match self.resolve(name, tags, MetricKind::Gauge)? {
            SeriesHandle::Gauge(gauge) => Ok(gauge),
            other => Err(conflict(name, other.kind(), MetricKind::Gauge)),
        }
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry.kinds.get(name).copied()
    }

    /// Sum of every counter series of `name` matching `filter`.
    #[must_use]
    pub fn counter_total(&self, name: &str, filter: &TagSet) -> u64 {
        self.matching(name, filter)
            .iter()
            .filter_map(|handle| match handle {
                SeriesHandle::Counter(counter) => Some(counter.total()),
                SeriesHandle::Rate(_) | SeriesHandle::Trend(_) | SeriesHandle::Gauge(_) => None,
            })
            .fold(0u64, u64::saturating_add)
    }

    #[must_use]
    pub fn rate_counts(&self, name: &str, filter: &TagSet) -> RateCounts {
        self.matching(name, filter)
            .iter()
            .filter_map(|handle| match handle {
                SeriesHandle::Rate(rate) => Some(rate.counts()),
                SeriesHandle::Counter(_) | SeriesHandle::Trend(_) | SeriesHandle::Gauge(_) => None,
            })
            .fold(RateCounts::default(), RateCounts::merge)
    }

    /// Merged distribution of every trend series of `name` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the histograms cannot be merged.
    pub fn trend_snapshot(
        &self,
        name: &str,
        filter: &TagSet,
    ) -> Result<TrendSnapshot, MetricsError> {
        let mut merged = TrendHistogram::new()?;
        for handle in self.matching(name, filter) {
            if let SeriesHandle::Trend(trend) = handle {
                merged.merge(&trend.merged()?)?;
            }
        }
        Ok(TrendSnapshot::new(merged))
    }

    /// Gauges of `name` matching `filter`, values summed.
    #[must_use]
    pub fn gauge_value(&self, name: &str, filter: &TagSet) -> GaugeValue {
        self.matching(name, filter)
            .iter()
            .filter_map(|handle| match handle {
                SeriesHandle::Gauge(gauge) => Some(gauge.value()),
                SeriesHandle::Counter(_) | SeriesHandle::Rate(_) | SeriesHandle::Trend(_) => None,
            })
            .fold(GaugeValue::default(), |acc, value| GaugeValue {
                value: acc.value.saturating_add(value.value),
                max: acc.max.saturating_add(value.max),
            })
    }

    /// Every registered series, sorted by name then tags.
    #[must_use]
    pub fn series(&self) -> Vec<SeriesSnapshot> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut series: Vec<SeriesSnapshot> = registry
            .series
            .iter()
            .map(|(key, handle)| SeriesSnapshot {
                name: key.name.clone(),
                tags: key.tags.clone(),
                kind: handle.kind(),
            })
            .collect();
        series.sort_by(|left, right| {
            left.name
                .cmp(&right.name)
                .then_with(|| left.tags.cmp(&right.tags))
        });
        series
    }

    fn matching(&self, name: &str, filter: &TagSet) -> Vec<SeriesHandle> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry
            .series
            .iter()
            .filter(|(key, _)| key.name == name && key.tags.matches(filter))
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    fn resolve(
        &self,
        name: &str,
        tags: &TagSet,
        kind: MetricKind,
    ) -> Result<SeriesHandle, MetricsError> {
        let key = SeriesKey {
            name: name.to_owned(),
            tags: tags.clone(),
        };
        {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = registry.series.get(&key) {
                return Ok(handle.clone());
            }
        }

        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = registry.kinds.get(name)
            && *existing != kind
        {
            return Err(conflict(name, *existing, kind));
        }
        if let Some(handle) = registry.series.get(&key) {
            return Ok(handle.clone());
        }
        let handle = match kind {
            MetricKind::Counter => SeriesHandle::Counter(Counter::default()),
            MetricKind::Rate => SeriesHandle::Rate(Rate::default()),
            MetricKind::Trend => SeriesHandle::Trend(Trend::new(self.trend_shards)?),
            MetricKind::Gauge => SeriesHandle::Gauge(Gauge::default()),
        };
        registry.kinds.insert(name.to_owned(), kind);
        registry.series.insert(key, handle.clone());
        Ok(handle)
    }
}

fn conflict(name: &str, existing: MetricKind, requested: MetricKind) -> MetricsError {
    MetricsError::KindConflict {
        name: name.to_owned(),
        existing,
        requested,
    }
}
