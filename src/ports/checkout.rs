//! Checkout provider port.
//!
//! External collaborator initiating a new purchase flow. The core's only
//! touchpoint: the metadata embedded here (`subscriber_id`, `plan`) must
//! round-trip unchanged into the webhook events the engine later receives.

use async_trait::async_trait;

use crate::domain::subscription::{Plan, SubscriberId};

use super::billing_client::BillingError;

/// Request to start a hosted checkout for one subscriber.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub subscriber_id: SubscriberId,
    pub plan: Plan,
}

/// Redirect handed back to the subscriber.
#[derive(Debug, Clone)]
pub struct CheckoutRedirect {
    pub url: String,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutRedirect, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn CheckoutProvider) {}
    }
}
