use reqwest::{Client, StatusCode};
use tracing::info;
use url::Url;

use crate::error::{AppError, AppResult, SetupError};
use crate::metrics::{MetricsCollector, TagSet, names};
use crate::runner::{CHECK_HEALTH, HEALTH_PATH, endpoint};

const SETUP_GROUP: &str = "setup";
const HEALTH_REQUEST_NAME: &str = "GET /actuator/health";

/// GETs `<base>/actuator/health` and fails unless it answers 200. The result
/// is recorded as the `health check passed` check.
///
/// # Errors
///
/// Returns a setup error when the service is unreachable or not healthy.
pub async fn check_health(
    client: &Client,
    base_url: &Url,
    collector: &MetricsCollector,
    base_tags: &TagSet,
) -> AppResult<()> {
    let url = endpoint(base_url, HEALTH_PATH)?;
    let tags = base_tags
        .clone()
        .with(names::TAG_GROUP, SETUP_GROUP)
        .with(names::TAG_NAME, HEALTH_REQUEST_NAME)
        .with(names::TAG_CHECK, CHECK_HEALTH);
    let check = collector.rate(names::CHECKS, &tags)?;

    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(err) => {
            check.add(false);
            return Err(AppError::setup(SetupError::Unreachable {
                url: url.to_string(),
                source: err,
            }));
        }
    };
    let status = response.status();
    check.add(status == StatusCode::OK);
    if status != StatusCode::OK {
        return Err(AppError::setup(SetupError::Unhealthy {
            url: url.to_string(),
            status: status.as_u16(),
        }));
    }
    info!("System health check passed");
    Ok(())
}
