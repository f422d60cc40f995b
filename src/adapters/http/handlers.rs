//! HTTP handlers.
//!
//! Three surfaces share one router: the webhook intake (signature-verified,
//! no user auth), the checkout initiation endpoint, and the admin query
//! surface (shared-key auth). Response codes on the webhook path follow one
//! rule: only verification and persistence failures are non-2xx, everything
//! downstream of a durable persist has already been acknowledged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::domain::subscription::{
    BillingWebhookVerifier, EngineError, ReconciliationEngine, SubscriberId, WebhookError,
};
use crate::ports::{BillingError, CheckoutProvider, CheckoutRequest, SubscriptionStore};

use super::dto::{
    CreateCheckoutSessionRequest, CreateCheckoutSessionResponse, ErrorResponse, SubscriptionView,
    WebhookAck,
};

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub verifier: Arc<BillingWebhookVerifier>,
    pub store: Arc<dyn SubscriptionStore>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub admin_key: Arc<String>,
}

/// API-level failures with their HTTP mapping.
#[derive(Debug)]
pub enum ApiError {
    Webhook(WebhookError),
    Engine(EngineError),
    Checkout(BillingError),
    Unauthorized,
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Webhook(err) => {
                (err.status_code(), "WEBHOOK_REJECTED", err.to_string())
            }
            ApiError::Engine(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_FAILED",
                err.to_string(),
            ),
            ApiError::Checkout(BillingError::Transient(e)) => {
                (StatusCode::BAD_GATEWAY, "BILLING_UNAVAILABLE", e)
            }
            ApiError::Checkout(err) => {
                (StatusCode::BAD_REQUEST, "CHECKOUT_REJECTED", err.to_string())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "missing or invalid admin key".to_string(),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "no subscription for this subscriber".to_string(),
            ),
        };

        (status, Json(ErrorResponse::new(error, message))).into_response()
    }
}

/// GET / - liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "vip-gate" }))
}

/// POST /stripe-webhook - billing event intake
pub async fn handle_billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Webhook(WebhookError::Malformed(
            "missing Stripe-Signature header".to_string(),
        )))?;

    let event = state
        .verifier
        .verify_and_parse(&body, signature)
        .map_err(|err| {
            tracing::warn!(error = %err, "rejected webhook delivery");
            ApiError::Webhook(err)
        })?;

    state
        .engine
        .apply(event)
        .await
        .map_err(ApiError::Engine)?;

    Ok(Json(WebhookAck { received: true }))
}

/// POST /create-checkout-session - start a purchase
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let redirect = state
        .checkout
        .create_session(CheckoutRequest {
            subscriber_id: SubscriberId::new(request.subscriber_id),
            plan: request.plan,
        })
        .await
        .map_err(ApiError::Checkout)?;

    Ok(Json(CreateCheckoutSessionResponse {
        checkout_url: redirect.url,
    }))
}

/// Shared-key auth for the admin surface. Exact match, constant time.
fn require_admin(headers: &HeaderMap, admin_key: &str) -> Result<(), ApiError> {
    let provided = headers
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let provided = provided.as_bytes();
    let expected = admin_key.as_bytes();
    if provided.len() != expected.len() || provided.ct_eq(expected).unwrap_u8() != 1 {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

/// GET /admin/subscriptions - every record, newest first
pub async fn list_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state.admin_key)?;

    let mut records = state.store.list_all().await.map_err(|e| {
        ApiError::Engine(EngineError::Persistence(e))
    })?;
    records.sort_by_key(|r| std::cmp::Reverse(r.last_event_at));

    let views: Vec<SubscriptionView> = records.into_iter().map(Into::into).collect();
    Ok(Json(views))
}

/// GET /admin/subscriptions/{subscriber_id} - one subscriber's record
pub async fn get_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(subscriber_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state.admin_key)?;

    let record = state
        .store
        .find_by_subscriber(&SubscriberId::new(subscriber_id))
        .await
        .map_err(|e| ApiError::Engine(EngineError::Persistence(e)))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(SubscriptionView::from(record)))
}
