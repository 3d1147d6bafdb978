//! Configuration loading and application.
mod apply;
mod loader;
mod parse;
mod scenario;
pub mod types;


pub use apply::{
    apply_config, parse_trend_stats, scenario_catalog, summary_trend_stats, think_time,
    workload_catalog,
};
pub use loader::{DEFAULT_CONFIG_FILES, load_config};

#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::parse_duration_value;
