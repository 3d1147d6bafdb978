use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::SetupError;

pub const DEFAULT_USER_AGENT: &str = concat!("orderload/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const ORDERS_PATH: &str = "api/v1/orders";
pub const HEALTH_PATH: &str = "actuator/health";

/// Builds the shared HTTP client. One client (and its connection pool) serves
/// every worker of a run.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialised.
pub fn build_client(request_timeout: Duration) -> Result<Client, SetupError> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(|source| SetupError::BuildClient { source })
}

/// Appends `path` to the base URL, keeping any path prefix the base has.
///
/// # Errors
///
/// Returns an error when the joined URL does not parse.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, SetupError> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|source| SetupError::InvalidBaseUrl {
        url: base.to_string(),
        source,
    })
}
