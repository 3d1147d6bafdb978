use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::*;
use crate::error::{AppError, AppResult, ThresholdError};
use crate::metrics::{MetricValue, MetricsCollector, TagSet, names};
use crate::shutdown::shutdown_channel;

fn run_paused<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn expect(condition: bool, message: &'static str) -> Result<(), ThresholdError> {
    if condition {
        Ok(())
    } else {
        Err(ThresholdError::TestExpectation { message })
    }
}

#[test]
fn parses_supported_expressions() -> Result<(), ThresholdError> {
    let p95: ThresholdExpr = "p(95)<500".parse()?;
    expect(
        p95.aggregation == Aggregation::Percentile(95.0)
            && p95.operator == Operator::Lt
            && p95.limit == MetricValue::from_int(500),
        "p(95)<500",
    )?;
    let rate: ThresholdExpr = "rate > 0.95".parse()?;
    expect(
        rate.aggregation == Aggregation::Rate && rate.operator == Operator::Gt,
        "rate > 0.95",
    )?;
    let le: ThresholdExpr = "avg<=200".parse()?;
    expect(le.operator == Operator::Le, "avg<=200 must be <=, not <")?;
    let ne: ThresholdExpr = "med!=0".parse()?;
    expect(ne.operator == Operator::Ne, "med!=0")?;
    let fine: ThresholdExpr = "p(99.9)<1500".parse()?;
    expect(fine.to_string() == "p(99.9)<1500", "display round-trips")?;
    Ok(())
}

#[test]
fn rejects_malformed_expressions() -> Result<(), ThresholdError> {
    expect(
        matches!("".parse::<ThresholdExpr>(), Err(ThresholdError::EmptyExpression)),
        "empty",
    )?;
    expect(
        matches!(
            "avg 5".parse::<ThresholdExpr>(),
            Err(ThresholdError::MissingOperator { .. })
        ),
        "missing operator",
    )?;
    expect(
        matches!(
            "p95<5".parse::<ThresholdExpr>(),
            Err(ThresholdError::UnknownAggregation { .. })
        ),
        "p95 without parens",
    )?;
    expect(
        matches!(
            "p(101)<5".parse::<ThresholdExpr>(),
            Err(ThresholdError::InvalidPercentile { .. })
        ),
        "percentile above 100",
    )?;
    expect(
        matches!(
            "avg<fast".parse::<ThresholdExpr>(),
            Err(ThresholdError::InvalidNumber { .. })
        ),
        "non-numeric limit",
    )?;
    Ok(())
}

#[test]
fn parses_tagged_metric_keys() -> Result<(), ThresholdError> {
    let (name, tags) = parse_metric_key("http_req_duration{name:POST /api/v1/orders}")?;
    expect(name == "http_req_duration", "metric name")?;
    expect(
        tags.get("name") == Some("POST /api/v1/orders"),
        "tag value keeps spaces and slashes",
    )?;
    let (bare, empty) = parse_metric_key("success_rate")?;
    expect(bare == "success_rate" && empty.is_empty(), "bare key")?;
    let (_, multi) = parse_metric_key("checks{check:order was created, group:Order Submission}")?;
    expect(
        multi.get("group") == Some("Order Submission") && multi.get("check").is_some(),
        "two tags",
    )?;
    for bad in ["metric{name:x", "{name:x}", "metric{novalue}", "metric{a:b}{c:d}"] {
        expect(
            matches!(
                parse_metric_key(bad),
                Err(ThresholdError::InvalidMetricKey { .. })
            ),
            "malformed key accepted",
        )?;
    }
    Ok(())
}

#[test]
fn aggregation_must_fit_metric_kind() -> Result<(), ThresholdError> {
    expect(
        matches!(
            Threshold::parse(names::SUCCESS_RATE, &["p(95)<1"]),
            Err(ThresholdError::UnsupportedAggregation { .. })
        ),
        "percentile on a rate",
    )?;
    expect(
        matches!(
            Threshold::parse(names::VUS, &["count<1"]),
            Err(ThresholdError::UnsupportedAggregation { .. })
        ),
        "count on a gauge",
    )?;
    Threshold::parse(names::ORDERS_FAILED, &["count<100", "rate<5"])?;
    Threshold::parse("custom_metric", &["p(95)<1"])?;
    Ok(())
}

#[test]
fn boundary_rate_fails_without_short_circuit() -> AppResult<()> {
    let collector = MetricsCollector::new();
    let success = collector.rate(names::SUCCESS_RATE, &TagSet::new())?;
    let failed = collector.counter(names::ORDERS_FAILED, &TagSet::new())?;
    for index in 0..100 {
        let ok = index >= 5;
        success.add(ok);
        if !ok {
            failed.inc();
        }
    }
    let thresholds = vec![
        Threshold::parse(names::SUCCESS_RATE, &["rate>0.95"])?,
        Threshold::parse(names::ORDERS_FAILED, &["count<100"])?,
    ];

    let results = evaluate(&thresholds, &collector, Duration::from_secs(10));

    let [rate, count] = results.as_slice() else {
        return Err(AppError::metrics(format!("expected two results, got {results:?}")));
    };
    if rate.passed || rate.observed != MetricValue::ratio(95, 100) {
        return Err(AppError::metrics(format!("rate>0.95 at exactly 0.95 must fail: {rate}")));
    }
    if !count.passed || count.observed != MetricValue::from_int(5) {
        return Err(AppError::metrics(format!("count<100 with 5 must pass: {count}")));
    }
    if all_passed(&results) {
        return Err(AppError::metrics("run must fail overall"));
    }
    Ok(())
}

#[test]
fn missing_series_aggregate_to_zero() -> AppResult<()> {
    let collector = MetricsCollector::new();
    let thresholds = vec![
        Threshold::parse(names::HTTP_REQ_DURATION, &["p(95)<500", "avg<200"])?,
        Threshold::parse(names::SUCCESS_RATE, &["rate>0.95"])?,
        Threshold::parse(names::DROPPED_ITERATIONS, &["count<10"])?,
    ];

    let results = evaluate(&thresholds, &collector, Duration::from_secs(1));

    let verdicts: Vec<bool> = results.iter().map(|result| result.passed).collect();
    if verdicts != [true, true, false, true] {
        return Err(AppError::metrics(format!("unexpected verdicts {results:?}")));
    }
    if results.iter().any(|result| result.observed != MetricValue::ZERO) {
        return Err(AppError::metrics(format!("missing series must read as zero: {results:?}")));
    }
    Ok(())
}

#[test]
fn tag_filter_selects_series() -> AppResult<()> {
    let collector = MetricsCollector::new();
    let orders = TagSet::new().with(names::TAG_NAME, "POST /api/v1/orders");
    let health = TagSet::new().with(names::TAG_NAME, "GET /actuator/health");
    let order_trend = collector.trend(names::HTTP_REQ_DURATION, &orders)?;
    let health_trend = collector.trend(names::HTTP_REQ_DURATION, &health)?;
    for _ in 0..50 {
        order_trend.record_duration(Duration::from_millis(100));
        health_trend.record_duration(Duration::from_secs(2));
    }

    let filtered = vec![Threshold::parse(
        "http_req_duration{name:POST /api/v1/orders}",
        &["max<500"],
    )?];
    let unfiltered = vec![Threshold::parse(names::HTTP_REQ_DURATION, &["max<500"])?];

    if !all_passed(&evaluate(&filtered, &collector, Duration::from_secs(1))) {
        return Err(AppError::metrics("filtered threshold saw health samples"));
    }
    if all_passed(&evaluate(&unfiltered, &collector, Duration::from_secs(1))) {
        return Err(AppError::metrics("unfiltered threshold missed health samples"));
    }
    Ok(())
}

#[test]
fn equality_compares_exact_decimals() -> AppResult<()> {
    let collector = MetricsCollector::new();
    let rate = collector.rate(names::SUCCESS_RATE, &TagSet::new())?;
    for index in 0..3 {
        rate.add(index != 0);
    }
    let thresholds = vec![
        Threshold::parse(names::SUCCESS_RATE, &["rate!=0.6666", "rate>0.666", "rate<0.667"])?,
        Threshold::parse(names::ORDERS_FAILED, &["count==0"])?,
    ];
    let results = evaluate(&thresholds, &collector, Duration::from_secs(1));
    if !all_passed(&results) {
        return Err(AppError::metrics(format!("unexpected results {results:?}")));
    }
    Ok(())
}

#[test]
fn counter_rate_is_per_second() -> AppResult<()> {
    let collector = MetricsCollector::new();
    collector
        .counter(names::HTTP_REQS, &TagSet::new())?
        .add(100);
    let thresholds = vec![Threshold::parse(names::HTTP_REQS, &["rate>=10", "rate<10.5"])?];
    let results = evaluate(&thresholds, &collector, Duration::from_secs(10));
    if !all_passed(&results) {
        return Err(AppError::metrics(format!("unexpected results {results:?}")));
    }
    Ok(())
}

#[test]
fn live_watch_aborts_on_failure() -> AppResult<()> {
    run_paused(async {
        let collector = Arc::new(MetricsCollector::new());
        let success = collector.rate(names::SUCCESS_RATE, &TagSet::new())?;
        success.add(false);
        let thresholds: Arc<[Threshold]> = Arc::from(vec![
            Threshold::parse(names::SUCCESS_RATE, &["rate>0.9"])?
                .with_abort_on_fail(Duration::from_secs(5)),
        ]);
        let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
        let started = Instant::now();

        let failures = watch_thresholds(
            thresholds,
            collector,
            Duration::from_secs(1),
            started,
            shutdown_tx,
        )
        .await
        .ok_or_else(|| AppError::metrics("watcher returned without failures"))?;

        if started.elapsed() < Duration::from_secs(5) {
            return Err(AppError::metrics("delay_abort_eval not honoured"));
        }
        if failures.len() != 1 || shutdown_rx.try_recv().is_err() {
            return Err(AppError::metrics(format!("unexpected failures {failures:?}")));
        }
        Ok(())
    })
}

#[test]
fn live_watch_ignores_thresholds_without_abort() -> AppResult<()> {
    run_paused(async {
        let collector = Arc::new(MetricsCollector::new());
        let thresholds: Arc<[Threshold]> =
            Arc::from(vec![Threshold::parse(names::SUCCESS_RATE, &["rate>0.9"])?]);
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let outcome = watch_thresholds(
            thresholds,
            collector,
            Duration::from_secs(1),
            Instant::now(),
            shutdown_tx,
        )
        .await;
        if outcome.is_some() {
            return Err(AppError::metrics("non-abort threshold stopped the run"));
        }
        Ok(())
    })
}
