//! Built-in metric and tag names.
use super::MetricKind;

pub const HTTP_REQS: &str = "http_reqs";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const ORDER_LATENCY: &str = "order_latency";
pub const ORDERS_CREATED: &str = "orders_created";
pub const ORDERS_FAILED: &str = "orders_failed";
pub const SUCCESS_RATE: &str = "success_rate";
pub const CHECKS: &str = "checks";
pub const ITERATIONS: &str = "iterations";
pub const ITERATION_DURATION: &str = "iteration_duration";
pub const ITERATION_PANICS: &str = "iteration_panics";
pub const ITERATIONS_INTERRUPTED: &str = "iterations_interrupted";
pub const ITERATIONS_LATE: &str = "iterations_late";
pub const DROPPED_ITERATIONS: &str = "dropped_iterations";
pub const VUS: &str = "vus";
pub const VUS_MAX: &str = "vus_max";

pub const TAG_NAME: &str = "name";
pub const TAG_GROUP: &str = "group";
pub const TAG_CHECK: &str = "check";
pub const TAG_SCENARIO: &str = "scenario";

/// Kind of a built-in metric, used to validate thresholds before any sample
/// exists.
#[must_use]
pub fn builtin_kind(name: &str) -> Option<MetricKind> {
    match name {
        HTTP_REQS | ORDERS_CREATED | ORDERS_FAILED | ITERATIONS | ITERATION_PANICS
        | ITERATIONS_INTERRUPTED | ITERATIONS_LATE | DROPPED_ITERATIONS => {
            Some(MetricKind::Counter)
        }
        HTTP_REQ_FAILED | SUCCESS_RATE | CHECKS => Some(MetricKind::Rate),
        HTTP_REQ_DURATION | ORDER_LATENCY | ITERATION_DURATION => Some(MetricKind::Trend),
        VUS | VUS_MAX => Some(MetricKind::Gauge),
        _ => None,
    }
}
