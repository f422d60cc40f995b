//! Billing provider configuration (Stripe)

use serde::Deserialize;

use super::error::ValidationError;

/// Billing configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Stripe price ID for the monthly plan
    pub stripe_monthly_price_id: Option<String>,

    /// Stripe price ID for the quarterly plan
    pub stripe_quarterly_price_id: Option<String>,

    /// Stripe price ID for the yearly plan
    pub stripe_yearly_price_id: Option<String>,

    /// Where checkout redirects after a successful payment
    #[serde(default = "default_success_url")]
    pub checkout_success_url: String,

    /// Where checkout redirects when the subscriber backs out
    #[serde(default = "default_cancel_url")]
    pub checkout_cancel_url: String,
}

impl BillingConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "BILLING__STRIPE_WEBHOOK_SECRET",
            ));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        Ok(())
    }
}

fn default_success_url() -> String {
    "https://t.me".to_string()
}

fn default_cancel_url() -> String {
    "https://t.me".to_string()
}
