//! Integration tests for the webhook intake and reconciliation flow.
//!
//! These drive the real verifier, engine, and in-memory store together,
//! with Stripe and Telegram behind mocks, through the lifecycle a real
//! subscription goes through: purchase, renewal, failed charge, end.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tower::ServiceExt;

use vip_gate::adapters::http::{app_router, AppState};
use vip_gate::adapters::storage::InMemorySubscriptionStore;
use vip_gate::domain::subscription::{
    BillingWebhookVerifier, Disposition, ReconciliationEngine, SubscriberId, SubscriptionStatus,
    WebhookError,
};
use vip_gate::ports::{
    AccessController, AccessError, AccessToken, BillingClient, BillingError, BillingSubscription,
    CheckoutProvider, CheckoutRedirect, CheckoutRequest, NotificationContext, NotificationKind,
    Notifier, NotifyError, SubscriptionStore,
};

const WEBHOOK_SECRET: &str = "whsec_integration_test_secret";

// ============================================================================
// Test doubles
// ============================================================================

struct UnavailableBilling;

#[async_trait]
impl BillingClient for UnavailableBilling {
    async fn subscription(&self, _id: &str) -> Result<BillingSubscription, BillingError> {
        Err(BillingError::Transient("no test server".to_string()))
    }
}

struct CountingAccess {
    grants: AtomicU32,
    revokes: AtomicU32,
}

impl CountingAccess {
    fn new() -> Self {
        Self {
            grants: AtomicU32::new(0),
            revokes: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AccessController for CountingAccess {
    async fn grant(&self, _subscriber: &SubscriberId) -> Result<AccessToken, AccessError> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken {
            invite_link: "https://t.me/+single-use".to_string(),
            single_use: true,
        })
    }

    async fn revoke(&self, _subscriber: &SubscriberId) -> Result<(), AccessError> {
        self.revokes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingNotifier {
    sent: Mutex<Vec<NotificationKind>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        _subscriber: &SubscriberId,
        kind: NotificationKind,
        _context: &NotificationContext,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(kind);
        Ok(())
    }
}

struct StubCheckout;

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn create_session(
        &self,
        _request: CheckoutRequest,
    ) -> Result<CheckoutRedirect, BillingError> {
        Ok(CheckoutRedirect {
            url: "https://checkout.stripe.com/test".to_string(),
        })
    }
}

struct Fixture {
    verifier: BillingWebhookVerifier,
    engine: ReconciliationEngine,
    store: Arc<InMemorySubscriptionStore>,
    access: Arc<CountingAccess>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let access = Arc::new(CountingAccess::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = ReconciliationEngine::new(
        store.clone(),
        Arc::new(UnavailableBilling),
        access.clone(),
        notifier.clone(),
    );
    Fixture {
        verifier: BillingWebhookVerifier::new(WEBHOOK_SECRET),
        engine,
        store,
        access,
        notifier,
    }
}

/// Sign a payload the way the provider does: HMAC-SHA256 over
/// `<timestamp>.<payload>`, delivered as `t=...,v1=...`.
fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn signed_now(payload: &str) -> String {
    sign(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload)
}

fn purchase_payload(event_id: &str, created: i64) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": created,
        "data": { "object": {
            "id": "cs_1",
            "subscription": "sub_1",
            "metadata": { "subscriber_id": "42", "plan": "monthly" }
        }},
        "livemode": false
    })
    .to_string()
}

fn ended_payload(event_id: &str, created: i64) -> String {
    json!({
        "id": event_id,
        "type": "customer.subscription.deleted",
        "created": created,
        "data": { "object": { "id": "sub_1", "status": "canceled" } },
        "livemode": false
    })
    .to_string()
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[tokio::test]
async fn subscription_lifecycle_grants_renews_and_revokes_once() {
    let fx = fixture();
    let base = chrono::Utc::now().timestamp();

    // Purchase: record created, one grant, one confirmation.
    let payload = purchase_payload("evt_1", base);
    let event = fx
        .verifier
        .verify_and_parse(payload.as_bytes(), &signed_now(&payload))
        .unwrap();
    let report = fx.engine.apply(event).await.unwrap();
    assert_eq!(report.disposition, Disposition::Created);
    assert_eq!(fx.access.grants.load(Ordering::SeqCst), 1);
    assert_eq!(fx.notifier.kinds(), vec![NotificationKind::Confirmed]);

    // Redelivery of the same event: silent.
    let event = fx
        .verifier
        .verify_and_parse(payload.as_bytes(), &signed_now(&payload))
        .unwrap();
    let report = fx.engine.apply(event).await.unwrap();
    assert_eq!(report.disposition, Disposition::Stale);
    assert_eq!(fx.access.grants.load(Ordering::SeqCst), 1);

    // Renewal charge: one renewal message, no new grant.
    let renewal = json!({
        "id": "evt_2",
        "type": "invoice.payment_succeeded",
        "created": base + 10,
        "data": { "object": { "id": "in_1", "subscription": "sub_1" } },
        "livemode": false
    })
    .to_string();
    let event = fx
        .verifier
        .verify_and_parse(renewal.as_bytes(), &signed_now(&renewal))
        .unwrap();
    fx.engine.apply(event).await.unwrap();
    assert_eq!(fx.access.grants.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.notifier.kinds(),
        vec![NotificationKind::Confirmed, NotificationKind::Renewed]
    );

    // Subscription ends: exactly one revoke and one removal notice.
    let ended = ended_payload("evt_3", base + 20);
    let event = fx
        .verifier
        .verify_and_parse(ended.as_bytes(), &signed_now(&ended))
        .unwrap();
    fx.engine.apply(event).await.unwrap();
    assert_eq!(fx.access.revokes.load(Ordering::SeqCst), 1);

    // Replay of the end event: nothing happens again.
    let event = fx
        .verifier
        .verify_and_parse(ended.as_bytes(), &signed_now(&ended))
        .unwrap();
    let report = fx.engine.apply(event).await.unwrap();
    assert_eq!(report.disposition, Disposition::Stale);
    assert_eq!(fx.access.revokes.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.notifier.kinds(),
        vec![
            NotificationKind::Confirmed,
            NotificationKind::Renewed,
            NotificationKind::AccessRemoved,
        ]
    );

    // Record survives as canceled for audit; it is never deleted.
    let record = fx
        .store
        .find_by_subscriber(&SubscriberId::new("42"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Canceled);
}

#[tokio::test]
async fn late_event_after_cancellation_cannot_resurrect_access() {
    let fx = fixture();
    let base = chrono::Utc::now().timestamp();

    for payload in [
        purchase_payload("evt_1", base),
        ended_payload("evt_2", base + 10),
    ] {
        let event = fx
            .verifier
            .verify_and_parse(payload.as_bytes(), &signed_now(&payload))
            .unwrap();
        fx.engine.apply(event).await.unwrap();
    }

    // A charge-succeeded event delivered late, with a newer timestamp.
    let late = json!({
        "id": "evt_3",
        "type": "invoice.paid",
        "created": base + 20,
        "data": { "object": { "id": "in_9", "subscription": "sub_1" } },
        "livemode": false
    })
    .to_string();
    let event = fx
        .verifier
        .verify_and_parse(late.as_bytes(), &signed_now(&late))
        .unwrap();
    let report = fx.engine.apply(event).await.unwrap();

    assert_eq!(report.disposition, Disposition::Pinned);
    let record = fx
        .store
        .find_by_subscriber(&SubscriberId::new("42"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Canceled);
    assert_eq!(fx.access.grants.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Verification boundary
// ============================================================================

#[tokio::test]
async fn forged_signature_never_reaches_the_engine() {
    let fx = fixture();
    let payload = purchase_payload("evt_1", chrono::Utc::now().timestamp());

    let forged = sign("whsec_wrong_secret", chrono::Utc::now().timestamp(), &payload);
    let result = fx.verifier.verify_and_parse(payload.as_bytes(), &forged);

    assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    assert!(fx
        .store
        .find_by_subscriber(&SubscriberId::new("42"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn replayed_old_signature_is_rejected() {
    let fx = fixture();
    let payload = purchase_payload("evt_1", chrono::Utc::now().timestamp());

    let stale = sign(
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp() - 3600,
        &payload,
    );
    let result = fx.verifier.verify_and_parse(payload.as_bytes(), &stale);

    assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
}

// ============================================================================
// HTTP surface
// ============================================================================

fn test_app(fx: Fixture) -> axum::Router {
    let state = AppState {
        engine: Arc::new(fx.engine),
        verifier: Arc::new(fx.verifier),
        store: fx.store,
        checkout: Arc::new(StubCheckout),
        admin_key: Arc::new("integration-admin-key".to_string()),
    };
    app_router(state, Duration::from_secs(5))
}

#[tokio::test]
async fn health_endpoint_answers() {
    let app = test_app(fixture());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn webhook_endpoint_accepts_signed_delivery() {
    let app = test_app(fixture());
    let payload = purchase_payload("evt_1", chrono::Utc::now().timestamp());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/stripe-webhook")
                .header("Stripe-Signature", signed_now(&payload))
                .header("content-type", "application/json")
                .body(axum::body::Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn webhook_endpoint_rejects_unsigned_delivery() {
    let app = test_app(fixture());
    let payload = purchase_payload("evt_1", chrono::Utc::now().timestamp());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/stripe-webhook")
                .body(axum::body::Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_surface_requires_the_key() {
    let app = test_app(fixture());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/admin/subscriptions")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_surface_returns_404_for_unknown_subscriber() {
    let app = test_app(fixture());

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/admin/subscriptions/999")
                .header("X-Admin-Key", "integration-admin-key")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}
