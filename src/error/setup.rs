use thiserror::Error;

/// Failures that abort a run before any order traffic is scheduled.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("System not healthy: {url} returned status {status}.")]
    Unhealthy { url: String, status: u16 },
    #[error("Health check against {url} failed: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
}
