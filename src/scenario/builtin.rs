use std::time::Duration;

use super::Scenario;
use crate::error::ThresholdError;
use crate::executor::{DEFAULT_GRACEFUL_STOP, DEFAULT_TIME_UNIT, ExecutorSpec, Stage};
use crate::metrics::{TrendStat, names};
use crate::threshold::Threshold;

const ORDER_DURATION: &str = "http_req_duration{name:POST /api/v1/orders}";

const fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

const fn mins(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

fn stages(plan: &[(Duration, u64)]) -> Vec<Stage> {
    plan.iter()
        .map(|&(duration, target)| Stage::new(duration, target))
        .collect()
}

fn scenario(
    name: &str,
    description: &str,
    executor: ExecutorSpec,
    thresholds: Vec<Threshold>,
) -> Scenario {
    Scenario {
        name: name.to_owned(),
        description: description.to_owned(),
        executor,
        thresholds,
        summary_trend_stats: None,
    }
}

pub(super) fn scenarios() -> Result<Vec<Scenario>, ThresholdError> {
    Ok(vec![
        scenario(
            "smoke",
            "Single VU for 30s; checks the system works at all.",
            ExecutorSpec::ConstantVus {
                vus: 1,
                duration: secs(30),
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(99)<1000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.99"])?,
            ],
        ),
        scenario(
            "load",
            "Ramp to 10, 25 and 50 VUs with holds between; the default profile.",
            ExecutorSpec::RampingVus {
                start_vus: 0,
                stages: stages(&[
                    (secs(30), 10),
                    (mins(1), 10),
                    (secs(30), 25),
                    (mins(2), 25),
                    (secs(30), 50),
                    (mins(2), 50),
                    (secs(30), 0),
                ]),
                graceful_ramp_down: secs(10),
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(95)<500", "p(99)<1000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.95"])?,
                Threshold::parse(names::ORDERS_FAILED, &["count<100"])?,
            ],
        ),
        scenario(
            "soak",
            "25 VUs held for an hour to surface leaks and drift.",
            ExecutorSpec::RampingVus {
                start_vus: 0,
                stages: stages(&[(mins(5), 25), (mins(60), 25), (mins(5), 0)]),
                graceful_ramp_down: secs(30),
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(95)<500", "p(99)<1000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.99"])?,
                Threshold::parse(names::ORDERS_FAILED, &["count<50"])?,
            ],
        ),
        scenario(
            "spike",
            "Sudden jump from 10 to 200 VUs and back.",
            ExecutorSpec::RampingVus {
                start_vus: 0,
                stages: stages(&[
                    (secs(30), 10),
                    (mins(1), 10),
                    (secs(10), 200),
                    (mins(2), 200),
                    (secs(10), 10),
                    (mins(1), 10),
                    (secs(30), 0),
                ]),
                graceful_ramp_down: secs(10),
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(95)<2000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.90"])?,
            ],
        ),
        scenario(
            "stress",
            "Step up to 300 VUs to find the breaking point.",
            ExecutorSpec::RampingVus {
                start_vus: 0,
                stages: stages(&[
                    (mins(1), 50),
                    (mins(2), 50),
                    (mins(1), 100),
                    (mins(2), 100),
                    (mins(1), 200),
                    (mins(2), 200),
                    (mins(1), 300),
                    (mins(2), 300),
                    (mins(2), 0),
                ]),
                graceful_ramp_down: secs(30),
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(95)<2000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.80"])?,
            ],
        ),
        Scenario {
            summary_trend_stats: Some(vec![
                TrendStat::Avg,
                TrendStat::Min,
                TrendStat::Med,
                TrendStat::Max,
                TrendStat::Percentile(90.0),
                TrendStat::Percentile(95.0),
                TrendStat::Percentile(99.0),
            ]),
            ..scenario(
                "capacity",
                "Arrival rate ramped to 200 orders/s to measure throughput.",
                ExecutorSpec::RampingArrivalRate {
                    start_rate: 10,
                    time_unit: DEFAULT_TIME_UNIT,
                    stages: stages(&[
                        (secs(30), 20),
                        (secs(30), 50),
                        (secs(30), 100),
                        (secs(30), 150),
                        (mins(1), 200),
                        (mins(1), 200),
                        (secs(30), 100),
                        (secs(30), 0),
                    ]),
                    pre_allocated_workers: 100,
                    max_workers: 500,
                    graceful_stop: DEFAULT_GRACEFUL_STOP,
                },
                vec![
                    Threshold::parse(ORDER_DURATION, &["p(95)<2000"])?,
                    Threshold::parse(names::SUCCESS_RATE, &["rate>0.80"])?,
                    Threshold::parse(names::HTTP_REQ_FAILED, &["rate<0.20"])?,
                ],
            )
        },
        scenario(
            "constant-rate",
            "Steady 100 orders/s for 5 minutes.",
            ExecutorSpec::ConstantArrivalRate {
                rate: 100,
                time_unit: DEFAULT_TIME_UNIT,
                duration: mins(5),
                pre_allocated_workers: 50,
                max_workers: 200,
                graceful_stop: DEFAULT_GRACEFUL_STOP,
            },
            vec![
                Threshold::parse(ORDER_DURATION, &["p(95)<500", "p(99)<1000"])?,
                Threshold::parse(names::SUCCESS_RATE, &["rate>0.99"])?,
                Threshold::parse(names::DROPPED_ITERATIONS, &["count<10"])?,
            ],
        ),
    ])
}
