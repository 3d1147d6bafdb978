//! The per-iteration unit of work: generate an order, submit it, classify the
//! response, record metrics, then pause for think time.
mod client;
mod response;
mod think;


use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use url::Url;

use crate::error::{AppResult, RequestError};
use crate::executor::{Iteration, IterationContext};
use crate::metrics::{Counter, MetricsCollector, Rate, TagSet, Trend, names};
use crate::workload::{OrderContext, OrderGenerator, OrderRequest};

pub use client::{
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, HEALTH_PATH, ORDERS_PATH, build_client, endpoint,
};
pub use response::{
    CHECK_CREATED, CHECK_HEALTH, CHECK_ORDER_ID, CHECK_STATUS, CheckResults, Classified,
    OrderResponse, classify,
};
pub use think::ThinkTime;

/// `name` tag on order submission metrics.
pub const REQUEST_NAME: &str = "POST /api/v1/orders";
/// `group` tag on order submission metrics.
pub const GROUP_NAME: &str = "Order Submission";
/// Value of the `X-OMS-Channel` header.
pub const CHANNEL: &str = "LOADTEST";

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub run_id: String,
    pub seed: Option<u64>,
    pub think_time: ThinkTime,
    pub debug: bool,
    /// Tags added to every series the runner writes (e.g. `scenario`).
    pub base_tags: TagSet,
}

/// Handles resolved once at construction; recording is lock-free apart from
/// the trend shards.
struct RunnerInstruments {
    http_req_duration: Trend,
    order_latency: Trend,
    http_reqs: Counter,
    http_req_failed: Rate,
    orders_created: Counter,
    orders_failed: Counter,
    success_rate: Rate,
    check_status: Rate,
    check_order_id: Rate,
    check_created: Rate,
}

impl RunnerInstruments {
    fn new(collector: &MetricsCollector, base: &TagSet) -> AppResult<Self> {
        let grouped = base.clone().with(names::TAG_GROUP, GROUP_NAME);
        let request = grouped.clone().with(names::TAG_NAME, REQUEST_NAME);
        let check = |name: &str| {
            collector.rate(names::CHECKS, &grouped.clone().with(names::TAG_CHECK, name))
        };
        Ok(Self {
            http_req_duration: collector.trend(names::HTTP_REQ_DURATION, &request)?,
            order_latency: collector.trend(names::ORDER_LATENCY, &request)?,
            http_reqs: collector.counter(names::HTTP_REQS, &request)?,
            http_req_failed: collector.rate(names::HTTP_REQ_FAILED, &request)?,
            orders_created: collector.counter(names::ORDERS_CREATED, &grouped)?,
            orders_failed: collector.counter(names::ORDERS_FAILED, &grouped)?,
            success_rate: collector.rate(names::SUCCESS_RATE, &grouped)?,
            check_status: check(CHECK_STATUS)?,
            check_order_id: check(CHECK_ORDER_ID)?,
            check_created: check(CHECK_CREATED)?,
        })
    }

    /// Folds one classified response into every series. Synchronous, so an
    /// aborted iteration either recorded all of it or none of it.
    fn record(&self, latency: Duration, classified: &Classified) {
        self.http_req_duration.record_duration(latency);
        self.order_latency.record_duration(latency);
        self.http_reqs.inc();

        let transport_failed = matches!(classified.outcome, Err(RequestError::Transport { .. }));
        let status_failed = classified
            .outcome
            .as_ref()
            .err()
            .and_then(RequestError::status)
            .is_some_and(|status| status >= 400);
        self.http_req_failed.add(transport_failed || status_failed);

        let checks = classified.checks;
        self.check_status.add(checks.status_ok);
        self.check_order_id.add(checks.has_order_id);
        self.check_created.add(checks.created);

        if checks.all_passed() {
            self.orders_created.inc();
            self.success_rate.add(true);
        } else {
            self.orders_failed.inc();
            self.success_rate.add(false);
        }
    }
}

/// Submits generated orders to `<base>/api/v1/orders`.
pub struct RequestRunner {
    client: Client,
    orders_url: Url,
    generator: OrderGenerator,
    config: RunnerConfig,
    instruments: RunnerInstruments,
}

impl RequestRunner {
    /// # Errors
    ///
    /// Returns an error when the orders URL cannot be derived from `base_url`
    /// or a runner metric clashes with an existing series kind.
    pub fn new(
        client: Client,
        base_url: &Url,
        generator: OrderGenerator,
        config: RunnerConfig,
        collector: &MetricsCollector,
    ) -> AppResult<Self> {
        let orders_url = endpoint(base_url, ORDERS_PATH)?;
        let instruments = RunnerInstruments::new(collector, &config.base_tags)?;
        Ok(Self {
            client,
            orders_url,
            generator,
            config,
            instruments,
        })
    }

    #[must_use]
    pub const fn orders_url(&self) -> &Url {
        &self.orders_url
    }

    /// Sends one order and records the outcome.
    pub async fn submit(&self, order: &OrderRequest) -> Classified {
        let request = self
            .client
            .post(self.orders_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-Id", order.client_order_id.as_str())
            .header("X-OMS-Channel", CHANNEL)
            .json(order);

        let started = Instant::now();
        let received = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                response.text().await.map(|body| (status, body))
            }
            Err(err) => Err(err),
        };
        let latency = started.elapsed();

        let (classified, body) = match received {
            Ok((status, body)) => (classify(status, &body), Some(body)),
            Err(source) => (Classified::transport(source), None),
        };
        self.instruments.record(latency, &classified);

        if let Err(err) = &classified.outcome {
            debug!(client_order_id = %order.client_order_id, "Order failed: {}", err);
            if self.config.debug {
                info!(
                    "Failed order: {} - {}",
                    err.status()
                        .map_or_else(|| "transport error".to_owned(), |status| status.to_string()),
                    body.as_deref().unwrap_or_default()
                );
            }
        }
        classified
    }

    fn iteration_rng(&self, ctx: IterationContext) -> StdRng {
        self.config.seed.map_or_else(StdRng::from_entropy, |seed| {
            StdRng::seed_from_u64(mix_seed(seed, ctx.worker_id, ctx.iteration))
        })
    }
}

#[async_trait]
impl Iteration for RequestRunner {
    async fn run(&self, ctx: IterationContext) {
        let (order, think) = {
            let mut rng = self.iteration_rng(ctx);
            let order_ctx = OrderContext {
                run_id: &self.config.run_id,
                worker_id: ctx.worker_id,
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
            };
            let order = self.generator.generate(&mut rng, &order_ctx);
            let think = self.config.think_time.sample(&mut rng);
            (order, think)
        };

        match order {
            Ok(order) => {
                self.submit(&order).await;
            }
            Err(err) => {
                debug!("Order generation failed: {}", err);
                self.instruments.orders_failed.inc();
                self.instruments.success_rate.add(false);
            }
        }

        if !think.is_zero() {
            sleep(think).await;
        }
    }
}

/// Derives an independent per-iteration seed (splitmix64 finaliser over the
/// run seed, worker and iteration).
pub(crate) fn mix_seed(seed: u64, worker_id: u64, iteration: u64) -> u64 {
    let mut value = seed
        ^ worker_id.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ iteration.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    value = (value ^ (value >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    value = (value ^ (value >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    value ^ (value >> 31)
}

/// Random draw helper shared with think time so both stay on the same RNG.
pub(crate) fn draw_millis<R>(rng: &mut R, min: u64, max: u64) -> u64
where
    R: Rng + ?Sized,
{
    if max > min { rng.gen_range(min..max) } else { min }
}
