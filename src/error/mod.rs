mod app;
mod config;
mod metrics;
mod request;
mod setup;
mod threshold;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use metrics::MetricsError;
pub use request::RequestError;
pub use setup::SetupError;
pub use threshold::ThresholdError;
pub use validation::ValidationError;
