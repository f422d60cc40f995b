//! Stripe billing gateway adapter.
//!
//! Implements the `BillingClient` and `CheckoutProvider` ports against the
//! Stripe REST API. Authentication uses the secret key as HTTP basic auth
//! username, request bodies are form-encoded per Stripe convention.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::subscription::Plan;
use crate::ports::{
    BillingClient, BillingError, BillingSubscription, CheckoutProvider, CheckoutRedirect,
    CheckoutRequest,
};

use super::wire::{StripeCheckoutSession, StripeSubscription};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeGatewayConfig {
    api_key: SecretString,
    api_base_url: String,
    monthly_price_id: Option<String>,
    quarterly_price_id: Option<String>,
    yearly_price_id: Option<String>,
    success_url: String,
    cancel_url: String,
}

impl StripeGatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            monthly_price_id: None,
            quarterly_price_id: None,
            yearly_price_id: None,
            success_url: "https://t.me".to_string(),
            cancel_url: "https://t.me".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_price_ids(
        mut self,
        monthly: Option<String>,
        quarterly: Option<String>,
        yearly: Option<String>,
    ) -> Self {
        self.monthly_price_id = monthly;
        self.quarterly_price_id = quarterly;
        self.yearly_price_id = yearly;
        self
    }

    pub fn with_redirect_urls(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.cancel_url = cancel_url.into();
        self
    }

    fn price_id(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Monthly => self.monthly_price_id.as_deref(),
            Plan::Quarterly => self.quarterly_price_id.as_deref(),
            Plan::Yearly => self.yearly_price_id.as_deref(),
            Plan::Unknown => None,
        }
    }
}

pub struct StripeGateway {
    config: StripeGatewayConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeGatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    async fn read_error(response: reqwest::Response) -> BillingError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, error = %body, "stripe api call failed");

        if status.is_server_error() {
            BillingError::Transient(format!("stripe {status}"))
        } else {
            BillingError::Protocol(format!("stripe {status}: {body}"))
        }
    }
}

#[async_trait]
impl BillingClient for StripeGateway {
    async fn subscription(
        &self,
        subscription_id: &str,
    ) -> Result<BillingSubscription, BillingError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| BillingError::Transient(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BillingError::NotFound);
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let wire: StripeSubscription = response
            .json()
            .await
            .map_err(|e| BillingError::Protocol(e.to_string()))?;

        Ok(wire.into())
    }
}

#[async_trait]
impl CheckoutProvider for StripeGateway {
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutRedirect, BillingError> {
        let price_id = self.config.price_id(request.plan).ok_or_else(|| {
            BillingError::Protocol(format!("no price configured for plan {}", request.plan))
        })?;

        let subscriber = request.subscriber_id.as_str().to_string();
        let plan = request.plan.to_string();

        // Metadata goes on both the session and the subscription it spawns,
        // so every later webhook event can identify the subscriber.
        let params = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", subscriber.clone()),
            ("metadata[subscriber_id]", subscriber.clone()),
            ("metadata[plan]", plan.clone()),
            ("subscription_data[metadata][subscriber_id]", subscriber),
            ("subscription_data[metadata][plan]", plan),
        ];

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| BillingError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let session: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| BillingError::Protocol(e.to_string()))?;

        let url = session.url.ok_or_else(|| {
            BillingError::Protocol(format!("checkout session {} has no url", session.id))
        })?;

        Ok(CheckoutRedirect { url })
    }
}
