use serde::Deserialize;
use serde_json::Value;

use crate::error::RequestError;

/// Body returned by `POST /api/v1/orders`, for created orders, duplicates
/// and rejections alike.
///
/// Only the fields the checks read are kept, and their JSON types are not
/// pinned: any non-null `orderId` counts, `created` must be `true`, and
/// every other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_id: Option<Value>,
    #[serde(default)]
    pub created: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl OrderResponse {
    #[must_use]
    pub fn has_order_id(&self) -> bool {
        self.order_id.as_ref().is_some_and(|id| !id.is_null())
    }

    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self.created, Some(Value::Bool(true)))
    }

    /// `message` as text; non-string values keep their JSON rendering.
    #[must_use]
    pub fn message_text(&self) -> Option<String> {
        match self.message.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

pub const CHECK_STATUS: &str = "status is 200 or 201";
pub const CHECK_ORDER_ID: &str = "response has orderId";
pub const CHECK_CREATED: &str = "order was created";
pub const CHECK_HEALTH: &str = "health check passed";

/// The three per-response checks, evaluated independently of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckResults {
    pub status_ok: bool,
    pub has_order_id: bool,
    pub created: bool,
}

impl CheckResults {
    #[must_use]
    pub const fn all_passed(self) -> bool {
        self.status_ok && self.has_order_id && self.created
    }
}

#[derive(Debug)]
pub struct Classified {
    pub checks: CheckResults,
    pub outcome: Result<OrderResponse, RequestError>,
}

impl Classified {
    pub(crate) fn transport(source: reqwest::Error) -> Self {
        Self {
            checks: CheckResults {
                status_ok: false,
                has_order_id: false,
                created: false,
            },
            outcome: Err(RequestError::Transport { source }),
        }
    }
}

/// Success iff the status is 200/201, the body parses, `orderId` is present
/// and `created` is true. When several conditions fail, the error names the
/// first in that order.
#[must_use]
pub fn classify(status: u16, body: &str) -> Classified {
    let parsed = serde_json::from_str::<OrderResponse>(body);
    let status_ok = matches!(status, 200 | 201);
    let checks = match &parsed {
        Ok(response) => CheckResults {
            status_ok,
            has_order_id: response.has_order_id(),
            created: response.was_created(),
        },
        Err(_) => CheckResults {
            status_ok,
            ..CheckResults::default()
        },
    };

    let outcome = match parsed {
        Ok(response) if !status_ok => Err(RequestError::UnexpectedStatus {
            status,
            message: response.message_text(),
        }),
        Err(_) if !status_ok => Err(RequestError::UnexpectedStatus {
            status,
            message: None,
        }),
        Err(source) => Err(RequestError::Parse { status, source }),
        Ok(_) if !checks.has_order_id => Err(RequestError::MissingOrderId { status }),
        Ok(response) if !checks.created => Err(RequestError::NotCreated {
            status,
            message: response.message_text(),
        }),
        Ok(response) => Ok(response),
    };

    Classified { checks, outcome }
}
