//! HTTP request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::{Plan, SubscriptionRecord};

/// Standard error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// POST /create-checkout-session request body.
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub subscriber_id: String,
    pub plan: Plan,
}

/// POST /create-checkout-session response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCheckoutSessionResponse {
    pub checkout_url: String,
}

/// Webhook acknowledgment body.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Admin view of one subscription record.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub subscription_id: String,
    pub subscriber_id: String,
    pub plan: String,
    pub status: String,
    pub entitled: bool,
    pub current_period_end: Option<i64>,
    pub last_event_at: i64,
    pub created_at: i64,
}

impl From<SubscriptionRecord> for SubscriptionView {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            subscription_id: record.subscription_id.as_str().to_string(),
            subscriber_id: record.subscriber_id.as_str().to_string(),
            plan: record.plan.to_string(),
            status: record.status.to_string(),
            entitled: record.is_entitled(),
            current_period_end: record.current_period_end,
            last_event_at: record.last_event_at,
            created_at: record.created_at,
        }
    }
}
