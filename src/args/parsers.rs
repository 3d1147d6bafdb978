use std::time::Duration;

use url::Url;

use crate::config::parse_duration_value;
use crate::error::{AppError, AppResult, ValidationError};

pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::validation)
}

pub(crate) fn parse_bool_env(s: &str) -> AppResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" | "" => Ok(false),
        _ => Err(AppError::validation(ValidationError::InvalidBoolean {
            value: s.to_owned(),
        })),
    }
}

/// Run ids end up inside `clientOrderId`, so only `[A-Za-z0-9_]` is allowed.
pub(crate) fn parse_run_id(s: &str) -> AppResult<String> {
    let value = s.trim();
    if value.is_empty()
        || !value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(AppError::validation(ValidationError::InvalidRunId {
            value: s.to_owned(),
        }));
    }
    Ok(value.to_owned())
}

/// Base URL of the order service; must be absolute with a host.
pub(crate) fn parse_base_url(s: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(s.trim()).map_err(|err| ValidationError::InvalidUrl {
        url: s.to_owned(),
        source: err,
    })?;
    if url.host_str().is_none() {
        return Err(ValidationError::UrlMissingHost { url: s.to_owned() });
    }
    Ok(url)
}
