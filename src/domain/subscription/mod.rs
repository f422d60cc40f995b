//! Subscription domain: the event model, the persisted record, the webhook
//! verifier, and the reconciliation engine that ties them together.

mod billing_event;
mod engine;
mod plan;
mod record;
mod status;
mod webhook_errors;
mod webhook_verifier;

pub use billing_event::{BillingEvent, BillingEventData, BillingEventKind, SubscriberMetadata};
pub use engine::{
    Disposition, Effect, EffectReport, EngineError, ReconciliationEngine, SkipReason,
};
pub use plan::Plan;
pub use record::{SubscriberId, SubscriptionId, SubscriptionRecord};
pub use status::SubscriptionStatus;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{BillingWebhookVerifier, SignatureHeader};

#[cfg(test)]
pub use billing_event::BillingEventBuilder;
