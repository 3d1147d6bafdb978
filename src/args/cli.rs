use clap::Parser;
use std::time::Duration;

use crate::scenario::DEFAULT_SCENARIO;

use super::defaults::DEFAULT_BASE_URL;
use super::parsers::{parse_bool_env, parse_duration_arg, parse_run_id};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Load generator for order-management HTTP services - VU and arrival-rate executors, weighted order workloads, tagged metrics and pass/fail thresholds."
)]
pub struct RunArgs {
    /// Scenario to run (see --list-scenarios)
    #[arg(long, short = 's', default_value = DEFAULT_SCENARIO)]
    pub scenario: String,

    /// Base URL of the order service
    #[arg(long = "base-url", short = 'u', env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log status and body of every failed order
    #[arg(long, env = "DEBUG", value_parser = parse_bool_env)]
    pub debug: bool,

    /// Path to config file (TOML/JSON). Defaults to ./orderload.toml or ./orderload.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Seed for reproducible order streams
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prefix for generated clientOrderIds (random when omitted)
    #[arg(long = "run-id", value_parser = parse_run_id)]
    pub run_id: Option<String>,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(
        long = "request-timeout",
        value_parser = parse_duration_arg,
        default_value = "30s"
    )]
    pub request_timeout: Duration,

    /// How often abort-on-fail thresholds are checked during the run (supports ms/s/m/h)
    #[arg(
        long = "threshold-interval",
        value_parser = parse_duration_arg,
        default_value = "2s"
    )]
    pub threshold_interval: Duration,

    /// Print the available scenarios and exit
    #[arg(long = "list-scenarios")]
    pub list_scenarios: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by ORDERLOAD_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}
