//! Axum router configuration.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_checkout_session, get_subscription, handle_billing_webhook, health,
    list_subscriptions, AppState,
};

/// Build the full application router.
///
/// # Routes
///
/// - `GET /` - liveness probe
/// - `POST /stripe-webhook` - billing event intake (signature verified)
/// - `POST /create-checkout-session` - start a purchase
/// - `GET /admin/subscriptions` - all records (X-Admin-Key)
/// - `GET /admin/subscriptions/{subscriber_id}` - one subscriber (X-Admin-Key)
pub fn app_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/stripe-webhook", post(handle_billing_webhook))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/admin/subscriptions", get(list_subscriptions))
        .route("/admin/subscriptions/:subscriber_id", get(get_subscription))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
