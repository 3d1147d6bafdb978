//! One load-test run: health check, scenario execution and the final report.
mod context;
mod controller;
mod health;
mod status;
mod summary;


pub use context::{RunContext, generate_run_id};
pub use controller::{RunController, RunOutcome, RunSettings};
pub use health::check_health;
pub use status::RunStatus;
pub use summary::{CheckSummary, RunSummary, TrendSummary};
