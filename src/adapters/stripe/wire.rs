//! Stripe REST API wire types.

use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::subscription::{Plan, SubscriberId, SubscriptionStatus};
use crate::ports::BillingSubscription;

/// Subscription object as returned by `GET /v1/subscriptions/{id}`.
#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Checkout session object as returned by `POST /v1/checkout/sessions`.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Map Stripe's subscription status strings onto the domain model.
///
/// Unrecognized statuses (new ones Stripe may introduce) land on `Pending`:
/// no access granted, nothing revoked, until a clearer event arrives.
pub fn map_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" | "trialing" => SubscriptionStatus::Active,
        "past_due" | "unpaid" => SubscriptionStatus::PastDue,
        "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Pending,
    }
}

impl From<StripeSubscription> for BillingSubscription {
    fn from(sub: StripeSubscription) -> Self {
        BillingSubscription {
            status: map_status(&sub.status),
            current_period_end: sub.current_period_end,
            subscriber_id: sub
                .metadata
                .get("subscriber_id")
                .map(|id| SubscriberId::new(id.clone())),
            plan: sub.metadata.get("plan").map(|p| Plan::parse(p)),
            id: sub.id,
        }
    }
}
