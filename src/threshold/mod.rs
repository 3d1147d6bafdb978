//! Pass/fail criteria over aggregated metrics.
//!
//! A threshold names a metric (optionally filtered by tags) and one or more
//! expressions such as `p(95)<500` or `rate>0.95`. Every expression is
//! evaluated, so a report always shows each observed value, and a run passes
//! only when all of them hold.
mod expr;
mod key;
mod watch;

#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::error::ThresholdError;
use crate::metrics::{MetricKind, MetricValue, MetricsCollector, TagSet, TrendStat, names};

pub use expr::{Aggregation, Operator, ThresholdExpr};
pub use key::parse_metric_key;
pub use watch::watch_thresholds;

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub filter: TagSet,
    pub exprs: Vec<ThresholdExpr>,
    /// Checked during the run; a failure stops it.
    pub abort_on_fail: bool,
    /// Grace period before live checks of this threshold begin.
    pub delay_abort_eval: Duration,
}

impl Threshold {
    /// Parses a k6-style key plus its expressions and checks that each
    /// aggregation applies to the metric when its kind is known up front.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed key or expression, or an aggregation
    /// that does not apply to a built-in metric.
    pub fn parse<S>(key: &str, exprs: &[S]) -> Result<Self, ThresholdError>
    where
        S: AsRef<str>,
    {
        let (metric, filter) = parse_metric_key(key)?;
        let exprs = exprs
            .iter()
            .map(|expr| expr.as_ref().parse::<ThresholdExpr>())
            .collect::<Result<Vec<_>, _>>()?;
        if exprs.is_empty() {
            return Err(ThresholdError::EmptyExpression);
        }
        let threshold = Self {
            metric,
            filter,
            exprs,
            abort_on_fail: false,
            delay_abort_eval: Duration::ZERO,
        };
        if let Some(kind) = names::builtin_kind(&threshold.metric) {
            threshold.check_kind(kind)?;
        }
        Ok(threshold)
    }

    /// Marks the threshold for live evaluation: once `delay` has passed, a
    /// failing check cancels the run.
    #[must_use]
    pub fn with_abort_on_fail(mut self, delay: Duration) -> Self {
        self.abort_on_fail = true;
        self.delay_abort_eval = delay;
        self
    }

    /// # Errors
    ///
    /// Returns the first expression whose aggregation does not apply to
    /// `kind`.
    pub fn check_kind(&self, kind: MetricKind) -> Result<(), ThresholdError> {
        self.exprs
            .iter()
            .find(|expr| !expr.aggregation.applies_to(kind))
            .map_or(Ok(()), |expr| {
                Err(ThresholdError::UnsupportedAggregation {
                    metric: self.metric.clone(),
                    kind,
                    aggregation: expr.aggregation.to_string(),
                })
            })
    }

    /// `metric{tag:value,...}`, or the bare name without a filter.
    #[must_use]
    pub fn key(&self) -> String {
        if self.filter.is_empty() {
            self.metric.clone()
        } else {
            format!("{}{}", self.metric, self.filter)
        }
    }
}

/// Outcome of one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub key: String,
    pub expr: String,
    pub observed: MetricValue,
    pub passed: bool,
    pub abort_on_fail: bool,
}

impl fmt::Display for ThresholdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (observed {:.4})",
            if self.passed { "PASS" } else { "FAIL" },
            self.key,
            self.expr,
            self.observed
        )
    }
}

/// Evaluates every expression of every threshold. `elapsed` is the run time
/// used for counter rates.
#[must_use]
pub fn evaluate(
    thresholds: &[Threshold],
    collector: &MetricsCollector,
    elapsed: Duration,
) -> Vec<ThresholdResult> {
    thresholds
        .iter()
        .flat_map(|threshold| evaluate_one(threshold, collector, elapsed))
        .collect()
}

/// True when every result passed (vacuously true for none).
#[must_use]
pub fn all_passed(results: &[ThresholdResult]) -> bool {
    results.iter().all(|result| result.passed)
}

fn evaluate_one(
    threshold: &Threshold,
    collector: &MetricsCollector,
    elapsed: Duration,
) -> Vec<ThresholdResult> {
    let kind = collector
        .kind_of(&threshold.metric)
        .or_else(|| names::builtin_kind(&threshold.metric));
    let key = threshold.key();
    threshold
        .exprs
        .iter()
        .map(|expr| {
            let (observed, passed) = match aggregate(collector, threshold, kind, expr.aggregation, elapsed) {
                Ok(observed) => (observed, expr.passes(observed)),
                Err(err) => {
                    warn!("Threshold {} {} cannot be evaluated: {}", key, expr, err);
                    (MetricValue::ZERO, false)
                }
            };
            ThresholdResult {
                key: key.clone(),
                expr: expr.to_string(),
                observed,
                passed,
                abort_on_fail: threshold.abort_on_fail,
            }
        })
        .collect()
}

/// Observed value for one aggregation; missing series read as zero.
fn aggregate(
    collector: &MetricsCollector,
    threshold: &Threshold,
    kind: Option<MetricKind>,
    aggregation: Aggregation,
    elapsed: Duration,
) -> Result<MetricValue, ThresholdError> {
    let Some(kind) = kind else {
        return Ok(MetricValue::ZERO);
    };
    if !aggregation.applies_to(kind) {
        return Err(ThresholdError::UnsupportedAggregation {
            metric: threshold.metric.clone(),
            kind,
            aggregation: aggregation.to_string(),
        });
    }
    let (name, filter) = (threshold.metric.as_str(), &threshold.filter);
    let observed = match kind {
        MetricKind::Counter => {
            let total = collector.counter_total(name, filter);
            match aggregation {
                Aggregation::Rate => MetricValue::per_second(total, elapsed),
                Aggregation::Count
                | Aggregation::Percentile(_)
                | Aggregation::Avg
                | Aggregation::Min
                | Aggregation::Max
                | Aggregation::Med
                | Aggregation::Value => MetricValue::from_count(total),
            }
        }
        MetricKind::Rate => collector.rate_counts(name, filter).ratio(),
        MetricKind::Gauge => MetricValue::from_int(collector.gauge_value(name, filter).value),
        MetricKind::Trend => {
            let snapshot = collector.trend_snapshot(name, filter)?;
            let stat = match aggregation {
                Aggregation::Percentile(p) => TrendStat::Percentile(p),
                Aggregation::Avg => TrendStat::Avg,
                Aggregation::Min => TrendStat::Min,
                Aggregation::Max => TrendStat::Max,
                Aggregation::Med => TrendStat::Med,
                Aggregation::Count | Aggregation::Rate | Aggregation::Value => TrendStat::Count,
            };
            snapshot.stat(stat)
        }
    };
    Ok(observed)
}
