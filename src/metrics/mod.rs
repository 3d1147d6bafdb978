//! Tagged metric registry: counters, rates, trends and gauges.
//!
//! Workers resolve a series handle once per name + tag set and then record
//! through it without touching the registry again. Queries merge every
//! series whose tags contain the requested filter.
mod collector;
mod histogram;
pub mod names;
mod series;
mod summary;
mod tags;
mod value;


pub use collector::{MetricsCollector, SeriesSnapshot};
pub use histogram::TrendHistogram;
pub use series::{Counter, Gauge, GaugeValue, MetricKind, Rate, RateCounts, Trend};
pub use summary::{TrendSnapshot, TrendStat};
pub use tags::TagSet;
pub use value::MetricValue;
