use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::RunArgs;
use crate::args::parsers::parse_run_id;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::metrics::TrendStat;
use crate::runner::ThinkTime;
use crate::scenario::ScenarioCatalog;
use crate::workload::WorkloadCatalog;

use super::scenario::build_scenario;
use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. Values given on the
/// command line are left alone.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_explicit(matches, "base_url")
        && let Some(base_url) = config.base_url.clone()
    {
        args.base_url = base_url;
    }

    if !is_explicit(matches, "debug")
        && let Some(debug) = config.debug
    {
        args.debug = debug;
    }

    if !is_cli(matches, "scenario")
        && let Some(scenario) = config.scenario.clone()
    {
        args.scenario = scenario;
    }

    if !is_cli(matches, "seed")
        && let Some(seed) = config.seed
    {
        args.seed = Some(seed);
    }

    if !is_cli(matches, "run_id")
        && let Some(run_id) = config.run_id.as_deref()
    {
        args.run_id = Some(parse_run_id(run_id)?);
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.request_timeout.as_ref()
    {
        args.request_timeout = field_duration(timeout, "request_timeout")?;
    }

    if !is_cli(matches, "threshold_interval")
        && let Some(interval) = config.threshold_interval.as_ref()
    {
        args.threshold_interval = field_duration(interval, "threshold_interval")?;
    }

    Ok(())
}

/// Built-in scenarios plus any defined in the config file.
///
/// # Errors
///
/// Returns an error when a configured scenario or threshold is invalid.
pub fn scenario_catalog(config: Option<&ConfigFile>) -> AppResult<ScenarioCatalog> {
    let mut catalog = ScenarioCatalog::builtin()?;
    let Some(scenarios) = config.and_then(|config| config.scenarios.as_ref()) else {
        return Ok(catalog);
    };
    for (name, scenario) in scenarios {
        let scenario = build_scenario(name, scenario)?;
        if catalog.insert(scenario).is_some() {
            tracing::info!("Config overrides built-in scenario '{}'", name);
        }
    }
    Ok(catalog)
}

/// Symbols and accounts, falling back to the built-in pools for whichever
/// list the config leaves out.
///
/// # Errors
///
/// Returns an error when a configured list is empty or a symbol is invalid.
pub fn workload_catalog(config: Option<&ConfigFile>) -> AppResult<WorkloadCatalog> {
    let symbols = config
        .and_then(|config| config.symbols.clone())
        .unwrap_or_else(WorkloadCatalog::default_symbols);
    for symbol in &symbols {
        symbol.validate().map_err(|err| invalid_field("symbols", err))?;
    }
    let accounts = config
        .and_then(|config| config.accounts.clone())
        .unwrap_or_else(WorkloadCatalog::default_accounts);
    WorkloadCatalog::new(symbols, accounts).map_err(AppError::validation)
}

/// # Errors
///
/// Returns an error when `min_ms` exceeds `max_ms`.
pub fn think_time(config: Option<&ConfigFile>) -> AppResult<ThinkTime> {
    let Some(think) = config.and_then(|config| config.think_time) else {
        return Ok(ThinkTime::default());
    };
    ThinkTime::new(
        Duration::from_millis(think.min_ms),
        Duration::from_millis(think.max_ms),
    )
    .map_err(|err| invalid_field("think_time", err))
}

/// Run-wide summary statistics; the built-in list when unset.
///
/// # Errors
///
/// Returns an error when an entry is not a known statistic.
pub fn summary_trend_stats(config: Option<&ConfigFile>) -> AppResult<Vec<TrendStat>> {
    config
        .and_then(|config| config.summary_trend_stats.as_ref())
        .map_or_else(
            || Ok(TrendStat::DEFAULT_SUMMARY.to_vec()),
            |values| {
                parse_trend_stats(values).map_err(|err| invalid_field("summary_trend_stats", err))
            },
        )
}

/// # Errors
///
/// Returns the first entry that does not parse as a trend statistic.
pub fn parse_trend_stats(values: &[String]) -> Result<Vec<TrendStat>, ValidationError> {
    values
        .iter()
        .map(|value| {
            value
                .parse::<TrendStat>()
                .map_err(|reason| ValidationError::InvalidTrendStat {
                    value: value.clone(),
                    reason,
                })
        })
        .collect()
}

fn field_duration(value: &DurationValue, field: &str) -> AppResult<Duration> {
    value
        .to_duration()
        .map_err(|err| invalid_field(field, err))
}

fn invalid_field(field: &str, source: ValidationError) -> AppError {
    AppError::config(ConfigError::InvalidField {
        field: field.to_owned(),
        source,
    })
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

/// Environment variables count as explicit too.
fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}
