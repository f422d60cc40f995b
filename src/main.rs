//! Service entry point: load configuration, wire adapters, serve.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use vip_gate::adapters::http::{app_router, AppState};
use vip_gate::adapters::storage::{InMemorySubscriptionStore, JsonFileSubscriptionStore};
use vip_gate::adapters::stripe::{StripeGateway, StripeGatewayConfig};
use vip_gate::adapters::telegram::{TelegramAccessController, TelegramApi, TelegramNotifier};
use vip_gate::config::AppConfig;
use vip_gate::domain::subscription::{BillingWebhookVerifier, ReconciliationEngine};
use vip_gate::ports::SubscriptionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let store: Arc<dyn SubscriptionStore> = match &config.storage.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using json file store");
            Arc::new(JsonFileSubscriptionStore::open(path).await?)
        }
        None => {
            tracing::warn!("no storage path configured, records are in-memory only");
            Arc::new(InMemorySubscriptionStore::new())
        }
    };

    let gateway = Arc::new(StripeGateway::new(
        StripeGatewayConfig::new(config.billing.stripe_api_key.clone())
            .with_price_ids(
                config.billing.stripe_monthly_price_id.clone(),
                config.billing.stripe_quarterly_price_id.clone(),
                config.billing.stripe_yearly_price_id.clone(),
            )
            .with_redirect_urls(
                config.billing.checkout_success_url.clone(),
                config.billing.checkout_cancel_url.clone(),
            ),
    ));

    let telegram_api = TelegramApi::new(config.telegram.bot_token.clone());
    let access = Arc::new(TelegramAccessController::new(
        telegram_api.clone(),
        config.telegram.group_chat_id,
        config.telegram.fallback_invite_link.clone(),
    ));
    let notifier = Arc::new(TelegramNotifier::new(telegram_api));

    let engine = Arc::new(ReconciliationEngine::new(
        store.clone(),
        gateway.clone(),
        access,
        notifier,
    ));
    let verifier = Arc::new(BillingWebhookVerifier::new(
        config.billing.stripe_webhook_secret.clone(),
    ));

    let state = AppState {
        engine,
        verifier,
        store,
        checkout: gateway,
        admin_key: Arc::new(config.admin.api_key.clone()),
    };

    let app = app_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, test_mode = config.billing.is_test_mode(), "vip-gate listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
