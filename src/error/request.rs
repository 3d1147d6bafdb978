use thiserror::Error;

/// Why a single order submission did not count as created. Recorded in the
/// metrics, never propagated out of an iteration.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected status {status}{}", detail(.message))]
    UnexpectedStatus {
        status: u16,
        message: Option<String>,
    },
    #[error("Status {status} with unreadable body: {source}")]
    Parse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("Status {status} response has no orderId.")]
    MissingOrderId { status: u16 },
    #[error("Status {status} order was not created{}", detail(.message))]
    NotCreated {
        status: u16,
        message: Option<String>,
    },
}

impl RequestError {
    /// HTTP status, if a response arrived at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            RequestError::Transport { .. } => None,
            RequestError::UnexpectedStatus { status, .. }
            | RequestError::Parse { status, .. }
            | RequestError::MissingOrderId { status }
            | RequestError::NotCreated { status, .. } => Some(*status),
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|msg| format!(": {msg}"))
        .unwrap_or_default()
}
