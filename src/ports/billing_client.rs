//! Billing client port.
//!
//! Read-only accessor resolving a subscription id to its authoritative
//! status at the billing provider. The engine treats every failure here as
//! transient: it falls back to the status implied by the event and logs a
//! reconciliation gap instead of failing the webhook call.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::{Plan, SubscriberId, SubscriptionStatus};

/// Authoritative subscription state as reported by the provider.
#[derive(Debug, Clone)]
pub struct BillingSubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<i64>,

    /// Checkout metadata round-tripped by the provider; lets the engine
    /// create records for subscriptions it has never seen before.
    pub subscriber_id: Option<SubscriberId>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Error)]
pub enum BillingError {
    /// Network failure, timeout, or provider 5xx. Retry may succeed.
    #[error("billing provider unavailable: {0}")]
    Transient(String),

    /// The provider does not know this subscription id.
    #[error("subscription not found at billing provider")]
    NotFound,

    /// The provider answered but the response could not be interpreted.
    #[error("billing provider protocol error: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Resolve a subscription id to its current authoritative state.
    async fn subscription(&self, subscription_id: &str)
        -> Result<BillingSubscription, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn BillingClient) {}
    }
}
