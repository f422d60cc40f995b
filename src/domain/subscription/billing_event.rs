//! Billing webhook event types.
//!
//! Structures for parsing Stripe webhook payloads. Only the fields the
//! reconciliation engine needs are captured; the rest of the provider's
//! event schema is ignored.

use serde::{Deserialize, Serialize};

use super::plan::Plan;
use super::record::SubscriberId;

/// A verified billing event as delivered on the webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEvent {
    /// Provider event id (`evt_...`), unique per delivery attempt chain.
    pub id: String,

    /// Wire event type, e.g. `invoice.payment_succeeded`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred at the provider (epoch seconds). This is the
    /// sequence the engine orders events by.
    pub created: i64,

    /// Event-specific payload.
    pub data: BillingEventData,

    /// Live vs test mode delivery.
    #[serde(default)]
    pub livemode: bool,

    /// Provider API version the event was rendered with.
    #[serde(default)]
    pub api_version: String,
}

/// Container for the polymorphic event object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEventData {
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// The event categories the engine models. Everything else is acknowledged
/// and ignored so the provider never retries events we do not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventKind {
    /// Initial checkout finished; metadata carries subscriber and plan.
    PurchaseCompleted,
    /// A recurring charge went through.
    ChargeSucceeded,
    /// A recurring charge failed.
    ChargeFailed,
    /// The subscription is over.
    SubscriptionEnded,
    /// Not modeled.
    Unknown,
}

/// Subscriber metadata embedded at checkout time, round-tripped by the
/// provider into later events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberMetadata {
    pub subscriber_id: Option<SubscriberId>,
    pub plan: Option<Plan>,
}

impl BillingEvent {
    pub fn kind(&self) -> BillingEventKind {
        match self.event_type.as_str() {
            "checkout.session.completed" => BillingEventKind::PurchaseCompleted,
            "invoice.payment_succeeded" | "invoice.paid" => BillingEventKind::ChargeSucceeded,
            "invoice.payment_failed" => BillingEventKind::ChargeFailed,
            "customer.subscription.deleted" => BillingEventKind::SubscriptionEnded,
            _ => BillingEventKind::Unknown,
        }
    }

    /// The subscription this event refers to, when it carries one.
    ///
    /// Invoices reference it via `object.subscription`; subscription-object
    /// events carry it as `object.id`.
    pub fn subscription_id(&self) -> Option<String> {
        if let Some(id) = self.data.object.get("subscription").and_then(|v| v.as_str()) {
            return Some(id.to_string());
        }
        if self.event_type.starts_with("customer.subscription.") {
            return self
                .data
                .object
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        None
    }

    /// Id of the payload object itself (checkout session id, invoice id, ...).
    pub fn object_id(&self) -> Option<String> {
        self.data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Subscriber metadata from `object.metadata`, if present.
    pub fn metadata(&self) -> SubscriberMetadata {
        let meta = match self.data.object.get("metadata") {
            Some(serde_json::Value::Object(map)) => map,
            _ => return SubscriberMetadata::default(),
        };

        SubscriberMetadata {
            subscriber_id: meta
                .get("subscriber_id")
                .and_then(|v| v.as_str())
                .map(SubscriberId::new),
            plan: meta.get("plan").and_then(|v| v.as_str()).map(Plan::parse),
        }
    }

    /// `object.current_period_end`, when the object carries one.
    pub fn period_end(&self) -> Option<i64> {
        self.data.object.get("current_period_end").and_then(|v| v.as_i64())
    }
}

/// Builder for test events.
#[cfg(test)]
pub struct BillingEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new(event_type: &str) -> Self {
        Self {
            id: "evt_test_1".to_string(),
            event_type: event_type.to_string(),
            created: 1_704_067_200,
            object: serde_json::json!({}),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: BillingEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: false,
            api_version: "2023-10-16".to_string(),
        }
    }
}
