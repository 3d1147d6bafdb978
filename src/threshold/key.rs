use crate::error::ThresholdError;
use crate::metrics::TagSet;

/// Splits a threshold key such as `http_req_duration{name:POST /api/v1/orders}`
/// into the metric name and its tag filter. A bare name yields an empty
/// filter.
///
/// # Errors
///
/// Returns an error on an empty name, unbalanced braces or a tag without a
/// `key:value` pair.
pub fn parse_metric_key(key: &str) -> Result<(String, TagSet), ThresholdError> {
    let invalid = || ThresholdError::InvalidMetricKey {
        key: key.to_owned(),
    };
    let key_trimmed = key.trim();
    let (name, filter) = match key_trimmed.split_once('{') {
        None => (key_trimmed, None),
        Some((name, rest)) => {
            let inner = rest.strip_suffix('}').ok_or_else(invalid)?;
            (name.trim(), Some(inner))
        }
    };
    if name.is_empty() || name.contains(['}', ' ']) {
        return Err(invalid());
    }

    let mut tags = TagSet::new();
    if let Some(inner) = filter {
        if inner.contains(['{', '}']) {
            return Err(invalid());
        }
        for pair in inner.split(',').filter(|pair| !pair.trim().is_empty()) {
            let (tag, value) = pair.split_once(':').ok_or_else(invalid)?;
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(invalid());
            }
            tags.insert(tag, value.trim());
        }
    }
    Ok((name.to_owned(), tags))
}
