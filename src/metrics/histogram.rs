use hdrhistogram::Histogram;

use crate::error::MetricsError;

use super::MetricValue;

/// Significant digits kept by every trend histogram (0.1% relative error).
const SIGNIFICANT_DIGITS: u8 = 3;

#[derive(Debug, Clone)]
pub struct TrendHistogram {
    hist: Histogram<u64>,
}

impl TrendHistogram {
    /// Create an empty auto-resizing histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let hist = Histogram::<u64>::new(SIGNIFICANT_DIGITS).map_err(|err| {
            MetricsError::Histogram {
                context: "create",
                source: Box::new(err),
            }
        })?;
        Ok(Self { hist })
    }

    /// Record a raw value in micro-units.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    pub fn record(&mut self, micros: u64) -> Result<(), MetricsError> {
        self.hist
            .record(micros)
            .map_err(|err| MetricsError::Histogram {
                context: "record",
                source: Box::new(err),
            })
    }

    /// Merge another histogram into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge fails.
    pub fn merge(&mut self, other: &TrendHistogram) -> Result<(), MetricsError> {
        self.hist
            .add(&other.hist)
            .map_err(|err| MetricsError::Histogram {
                context: "merge",
                source: Box::new(err),
            })
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }

    #[must_use]
    pub fn min(&self) -> MetricValue {
        if self.count() == 0 {
            return MetricValue::ZERO;
        }
        MetricValue::from_micros(self.hist.min())
    }

    #[must_use]
    pub fn max(&self) -> MetricValue {
        if self.count() == 0 {
            return MetricValue::ZERO;
        }
        MetricValue::from_micros(self.hist.max())
    }

    /// Mean of the recorded values, each taken at its bucket's midpoint.
    #[must_use]
    pub fn mean(&self) -> MetricValue {
        let (sum, count) = self.hist.iter_recorded().fold(
            (0_u128, 0_u64),
            |(sum, count), bucket| {
                let value = self.hist.median_equivalent(bucket.value_iterated_to());
                let recorded = bucket.count_at_value();
                (
                    sum.saturating_add(u128::from(value).saturating_mul(u128::from(recorded))),
                    count.saturating_add(recorded),
                )
            },
        );
        let mean = sum.checked_div(u128::from(count)).unwrap_or(0);
        MetricValue::from_micros(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    /// Value at `percentile` (0..=100) in the trend's unit.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> MetricValue {
        if self.count() == 0 {
            return MetricValue::ZERO;
        }
        MetricValue::from_micros(self.hist.value_at_percentile(percentile.clamp(0.0, 100.0)))
    }
}
