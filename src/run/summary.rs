use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::error::MetricsError;
use crate::executor::ExecutorReport;
use crate::metrics::{
    MetricKind, MetricValue, MetricsCollector, RateCounts, TagSet, TrendStat, names,
};

/// Requested statistics of one trend, merged across its tagged series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    pub name: String,
    pub count: u64,
    pub stats: Vec<(TrendStat, MetricValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub counts: RateCounts,
}

/// End-of-run report printed at teardown.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub scenario: String,
    pub elapsed: Duration,
    pub trends: Vec<TrendSummary>,
    pub checks: Vec<CheckSummary>,
    pub http_reqs: u64,
    pub iterations: u64,
    pub orders_created: u64,
    pub orders_failed: u64,
    pub dropped_iterations: u64,
    pub iterations_late: u64,
    pub iteration_panics: u64,
    pub iterations_interrupted: u64,
    /// Worst start lag of a late arrival-rate iteration.
    pub max_lag: Duration,
    pub success: RateCounts,
    pub vus_max: i64,
}

impl RunSummary {
    /// Reads every series out of `collector`; `report` supplies what only
    /// the executor knows, such as the worst start lag.
    ///
    /// # Errors
    ///
    /// Returns an error if a trend's histograms cannot be merged.
    pub fn collect(
        collector: &MetricsCollector,
        scenario: &str,
        elapsed: Duration,
        report: &ExecutorReport,
        trend_stats: &[TrendStat],
    ) -> Result<Self, MetricsError> {
        let all = TagSet::new();
        let series = collector.series();

        let trend_names: BTreeSet<&str> = series
            .iter()
            .filter(|series| series.kind == MetricKind::Trend)
            .map(|series| series.name.as_str())
            .collect();
        let mut trends = Vec::with_capacity(trend_names.len());
        for name in trend_names {
            let snapshot = collector.trend_snapshot(name, &all)?;
            trends.push(TrendSummary {
                name: name.to_owned(),
                count: snapshot.count(),
                stats: trend_stats
                    .iter()
                    .map(|&stat| (stat, snapshot.stat(stat)))
                    .collect(),
            });
        }

        let check_names: BTreeSet<&str> = series
            .iter()
            .filter(|series| series.name == names::CHECKS)
            .filter_map(|series| series.tags.get(names::TAG_CHECK))
            .collect();
        let checks = check_names
            .into_iter()
            .map(|name| CheckSummary {
                name: name.to_owned(),
                counts: collector
                    .rate_counts(names::CHECKS, &TagSet::new().with(names::TAG_CHECK, name)),
            })
            .collect();

        Ok(Self {
            scenario: scenario.to_owned(),
            elapsed,
            trends,
            checks,
            http_reqs: collector.counter_total(names::HTTP_REQS, &all),
            iterations: collector.counter_total(names::ITERATIONS, &all),
            orders_created: collector.counter_total(names::ORDERS_CREATED, &all),
            orders_failed: collector.counter_total(names::ORDERS_FAILED, &all),
            dropped_iterations: collector.counter_total(names::DROPPED_ITERATIONS, &all),
            iterations_late: collector.counter_total(names::ITERATIONS_LATE, &all),
            iteration_panics: collector.counter_total(names::ITERATION_PANICS, &all),
            iterations_interrupted: collector.counter_total(names::ITERATIONS_INTERRUPTED, &all),
            max_lag: report.max_lag,
            success: collector.rate_counts(names::SUCCESS_RATE, &all),
            vus_max: collector.gauge_value(names::VUS_MAX, &all).max,
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scenario '{}' completed in {:.2}s",
            self.scenario,
            self.elapsed.as_secs_f64()
        )?;
        for trend in &self.trends {
            write!(f, "  {:<22} count={}", trend.name, trend.count)?;
            for (stat, value) in &trend.stats {
                write!(f, " {}={:.2}ms", stat, value)?;
            }
            writeln!(f)?;
        }
        for check in &self.checks {
            writeln!(
                f,
                "  check '{}': {:.2}% ({} / {})",
                check.name,
                check.counts.percent(),
                check.counts.passes,
                check.counts.total()
            )?;
        }
        writeln!(
            f,
            "  http_reqs={} iterations={} vus_max={}",
            self.http_reqs, self.iterations, self.vus_max
        )?;
        writeln!(
            f,
            "  iterations_late={} max_lag={}ms iteration_panics={} iterations_interrupted={}",
            self.iterations_late,
            self.max_lag.as_millis(),
            self.iteration_panics,
            self.iterations_interrupted
        )?;
        write!(
            f,
            "  orders_created={} orders_failed={} dropped_iterations={} success_rate={:.2}%",
            self.orders_created,
            self.orders_failed,
            self.dropped_iterations,
            self.success.percent()
        )
    }
}
