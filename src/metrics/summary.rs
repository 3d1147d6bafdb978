use std::fmt;
use std::str::FromStr;

use super::{MetricValue, TrendHistogram};

/// One statistic of a trend, as used by thresholds and the summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrendStat {
    Avg,
    Min,
    Med,
    Max,
    Count,
    Percentile(f64),
}

impl TrendStat {
    /// Stats printed when the scenario does not override them.
    pub const DEFAULT_SUMMARY: [TrendStat; 6] = [
        TrendStat::Avg,
        TrendStat::Min,
        TrendStat::Med,
        TrendStat::Max,
        TrendStat::Percentile(90.0),
        TrendStat::Percentile(95.0),
    ];
}

impl fmt::Display for TrendStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStat::Avg => f.write_str("avg"),
            TrendStat::Min => f.write_str("min"),
            TrendStat::Med => f.write_str("med"),
            TrendStat::Max => f.write_str("max"),
            TrendStat::Count => f.write_str("count"),
            TrendStat::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

impl FromStr for TrendStat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value {
            "avg" => return Ok(TrendStat::Avg),
            "min" => return Ok(TrendStat::Min),
            "med" => return Ok(TrendStat::Med),
            "max" => return Ok(TrendStat::Max),
            "count" => return Ok(TrendStat::Count),
            _ => {}
        }
        let inner = value
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("Unknown trend stat '{}'.", value))?;
        let percentile: f64 = inner
            .trim()
            .parse()
            .map_err(|err| format!("Invalid percentile '{}': {}", inner, err))?;
        if !(0.0..=100.0).contains(&percentile) {
            return Err(format!("Percentile '{}' must be within 0..=100.", inner));
        }
        Ok(TrendStat::Percentile(percentile))
    }
}

/// Point-in-time view of a (possibly merged) trend.
#[derive(Debug, Clone)]
pub struct TrendSnapshot {
    hist: TrendHistogram,
}

impl TrendSnapshot {
    pub(crate) const fn new(hist: TrendHistogram) -> Self {
        Self { hist }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.count()
    }

    #[must_use]
    pub fn stat(&self, stat: TrendStat) -> MetricValue {
        match stat {
            TrendStat::Avg => self.hist.mean(),
            TrendStat::Min => self.hist.min(),
            TrendStat::Med => self.hist.percentile(50.0),
            TrendStat::Max => self.hist.max(),
            TrendStat::Count => MetricValue::from_count(self.hist.count()),
            TrendStat::Percentile(p) => self.hist.percentile(p),
        }
    }

    #[must_use]
    pub fn percentile(&self, percentile: f64) -> MetricValue {
        self.stat(TrendStat::Percentile(percentile))
    }
}
