use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};

use crate::args::RunArgs;
use crate::args::parsers::parse_base_url;
use crate::config::types::ConfigFile;
use crate::config::{
    apply_config, load_config, scenario_catalog, summary_trend_stats, think_time, workload_catalog,
};
use crate::error::{AppError, AppResult};
use crate::run::{RunController, RunSettings, RunStatus, generate_run_id};
use crate::scenario::ScenarioCatalog;

/// Binary entry point: parses the CLI, runs the selected scenario and maps
/// the verdict onto the exit code.
#[must_use]
pub fn run() -> ExitCode {
    match try_run() {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {}", err);
            RunStatus::from_error(&err).map_or(ExitCode::FAILURE, ExitCode::from)
        }
    }
}

fn try_run() -> AppResult<RunStatus> {
    let matches = RunArgs::command().get_matches();
    let mut args = RunArgs::from_arg_matches(&matches)?;

    crate::logger::init_logging(args.verbose, args.no_color);

    let config = load_config(args.config.as_deref())?;
    if let Some(config) = config.as_ref() {
        apply_config(&mut args, &matches, config)?;
    }
    let catalog = scenario_catalog(config.as_ref())?;

    if args.list_scenarios {
        print_scenarios(&catalog);
        return Ok(RunStatus::Passed);
    }

    let settings = build_settings(&args, config.as_ref(), &catalog)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let outcome = RunController::new(settings)?
            .with_signal_handler()
            .run()
            .await?;
        Ok::<_, AppError>(outcome.status)
    })
}

fn build_settings(
    args: &RunArgs,
    config: Option<&ConfigFile>,
    catalog: &ScenarioCatalog,
) -> AppResult<RunSettings> {
    let base_url = parse_base_url(&args.base_url).map_err(AppError::validation)?;
    let scenario = catalog.get(&args.scenario)?.clone();
    Ok(RunSettings {
        base_url,
        scenario,
        workload: workload_catalog(config)?,
        think_time: think_time(config)?,
        summary_trend_stats: summary_trend_stats(config)?,
        run_id: args.run_id.clone().unwrap_or_else(generate_run_id),
        seed: args.seed,
        debug: args.debug,
        request_timeout: args.request_timeout,
        threshold_interval: args.threshold_interval,
    })
}

fn print_scenarios(catalog: &ScenarioCatalog) {
    for scenario in catalog.iter() {
        println!(
            "{:<14} {:<22} {:>8}s  {}",
            scenario.name,
            scenario.executor.kind(),
            scenario.executor.planned_duration().as_secs(),
            scenario.description
        );
    }
}
