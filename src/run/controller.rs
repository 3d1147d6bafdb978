use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, warn};
use url::Url;

use super::context::RunContext;
use super::health::check_health;
use super::status::RunStatus;
use super::summary::RunSummary;
use crate::error::AppResult;
use crate::executor::{Executor, ExecutorReport};
use crate::metrics::{MetricsCollector, TagSet, TrendStat, names};
use crate::runner::{RequestRunner, RunnerConfig, ThinkTime, build_client};
use crate::scenario::Scenario;
use crate::shutdown::{ShutdownSender, setup_signal_shutdown_handler};
use crate::threshold::{self, Threshold, ThresholdResult, watch_thresholds};
use crate::workload::{OrderGenerator, WorkloadCatalog};

/// Everything a run needs, resolved from CLI, config file and scenario.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_url: Url,
    pub scenario: Scenario,
    pub workload: WorkloadCatalog,
    pub think_time: ThinkTime,
    pub summary_trend_stats: Vec<TrendStat>,
    pub run_id: String,
    pub seed: Option<u64>,
    pub debug: bool,
    pub request_timeout: Duration,
    pub threshold_interval: Duration,
}

impl RunSettings {
    /// Scenario-level stats win over the run-wide list.
    fn trend_stats(&self) -> &[TrendStat] {
        self.scenario
            .summary_trend_stats
            .as_deref()
            .unwrap_or(self.summary_trend_stats.as_slice())
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub run_id: String,
    pub report: ExecutorReport,
    pub summary: RunSummary,
    pub thresholds: Vec<ThresholdResult>,
}

/// Drives setup, execution and teardown of one scenario.
pub struct RunController {
    settings: RunSettings,
    client: Client,
    context: RunContext,
    handle_signals: bool,
}

impl RunController {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: RunSettings) -> AppResult<Self> {
        let client = build_client(settings.request_timeout)?;
        let context = RunContext::new(settings.run_id.clone());
        Ok(Self {
            settings,
            client,
            context,
            handle_signals: false,
        })
    }

    /// Forward Ctrl-C and SIGTERM into the run's shutdown channel.
    #[must_use]
    pub const fn with_signal_handler(mut self) -> Self {
        self.handle_signals = true;
        self
    }

    #[must_use]
    pub fn collector(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.context.collector)
    }

    /// Sender that stops the run when anything is broadcast on it.
    #[must_use]
    pub fn shutdown_sender(&self) -> ShutdownSender {
        self.context.shutdown_tx.clone()
    }

    /// # Errors
    ///
    /// Returns a setup error when the health check fails; no orders are sent
    /// in that case. Other errors come from metric registration or task
    /// failures.
    pub async fn run(mut self) -> AppResult<RunOutcome> {
        info!(
            run_id = %self.context.run_id,
            scenario = %self.settings.scenario.name,
            "Starting load test against {}",
            self.settings.base_url
        );
        self.setup().await?;
        let (report, aborted) = self.execute().await?;
        self.teardown(report, aborted.is_some())
    }

    async fn setup(&mut self) -> AppResult<()> {
        check_health(
            &self.client,
            &self.settings.base_url,
            &self.context.collector,
            &self.scenario_tags(),
        )
        .await?;
        self.context.mark_started();
        Ok(())
    }

    async fn execute(&self) -> AppResult<(ExecutorReport, Option<Vec<ThresholdResult>>)> {
        let collector = &self.context.collector;
        let shutdown_tx = &self.context.shutdown_tx;
        let tags = self.scenario_tags();

        let runner = RequestRunner::new(
            self.client.clone(),
            &self.settings.base_url,
            OrderGenerator::new(self.settings.workload.clone()),
            RunnerConfig {
                run_id: self.context.run_id.clone(),
                seed: self.settings.seed,
                think_time: self.settings.think_time,
                debug: self.settings.debug,
                base_tags: tags.clone(),
            },
            collector,
        )?;
        let executor = Executor::new(self.settings.scenario.executor.clone(), collector, &tags)?;

        let cancel = shutdown_tx.subscribe();
        let signals = self
            .handle_signals
            .then(|| setup_signal_shutdown_handler(shutdown_tx));
        let thresholds: Arc<[Threshold]> = Arc::from(self.settings.scenario.thresholds.as_slice());
        let watcher = tokio::spawn(watch_thresholds(
            thresholds,
            Arc::clone(collector),
            self.settings.threshold_interval,
            self.context.started,
            shutdown_tx.clone(),
        ));

        let report = executor.run(Arc::new(runner), cancel).await;

        // The watcher returns as soon as it broadcasts an abort, so a
        // finished handle here means it stopped the run.
        watcher.abort();
        let aborted = match watcher.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => None,
            Err(err) => return Err(err.into()),
        };
        if let Some(signals) = signals {
            signals.abort();
        }
        Ok((report, aborted))
    }

    fn teardown(&self, report: ExecutorReport, aborted: bool) -> AppResult<RunOutcome> {
        let elapsed = self.context.started.elapsed();
        info!(
            started_at = %self.context.started_at.to_rfc3339(),
            "Load test completed in {:.2}s",
            elapsed.as_secs_f64()
        );

        let collector = &self.context.collector;
        let summary = RunSummary::collect(
            collector,
            &self.settings.scenario.name,
            elapsed,
            &report,
            self.settings.trend_stats(),
        )?;
        let results = threshold::evaluate(&self.settings.scenario.thresholds, collector, elapsed);

        println!("{summary}");
        for result in &results {
            println!("  {result}");
        }

        let status = if aborted {
            RunStatus::Aborted
        } else if threshold::all_passed(&results) {
            RunStatus::Passed
        } else {
            RunStatus::ThresholdsFailed
        };
        match status {
            RunStatus::Passed => info!("Run {}: {}", self.context.run_id, status),
            RunStatus::ThresholdsFailed | RunStatus::SetupFailed => {
                warn!("Run {}: {}", self.context.run_id, status);
            }
            RunStatus::Aborted => error!("Run {}: {}", self.context.run_id, status),
        }
        if report.cancelled && !aborted {
            warn!("Run was interrupted before the schedule finished.");
        }

        Ok(RunOutcome {
            status,
            run_id: self.context.run_id.clone(),
            report,
            summary,
            thresholds: results,
        })
    }

    fn scenario_tags(&self) -> TagSet {
        TagSet::new().with(names::TAG_SCENARIO, &self.settings.scenario.name)
    }
}
