//! The persisted subscription record and its reconciliation rules.
//!
//! A record is created the first time any event references its subscription
//! id, mutated in place on every later accepted event, and never deleted —
//! a `canceled` record stays around for audit and idempotency checks.

use serde::{Deserialize, Serialize};

use super::plan::Plan;
use super::status::SubscriptionStatus;

/// Billing-provider subscription identifier (`sub_...`), or the checkout
/// session id for provisional records created before a subscription exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messaging-platform user identifier (Telegram user id, kept as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Telegram chat/user ids are numeric on the wire.
    pub fn as_chat_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The sole persisted entity: one record per subscription id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub subscription_id: SubscriptionId,

    pub subscriber_id: SubscriberId,

    /// Informational tier token; never consulted for access decisions.
    pub plan: Plan,

    pub status: SubscriptionStatus,

    /// End of the current billing period (epoch seconds). Used only in
    /// user-facing messaging.
    pub current_period_end: Option<i64>,

    /// Monotonic marker: `created` timestamp of the most recent event that
    /// was accepted against this record. Events at or before this point are
    /// treated as duplicates.
    pub last_event_at: i64,

    /// Id of that most recent accepted event.
    pub last_event_id: String,

    /// When this record was first created (epoch seconds).
    pub created_at: i64,
}

impl SubscriptionRecord {
    /// Create a record on first sight of a subscription id.
    pub fn create(
        subscription_id: SubscriptionId,
        subscriber_id: SubscriberId,
        plan: Plan,
        status: SubscriptionStatus,
        current_period_end: Option<i64>,
        event_id: &str,
        occurred_at: i64,
    ) -> Self {
        Self {
            subscription_id,
            subscriber_id,
            plan,
            status,
            current_period_end,
            last_event_at: occurred_at,
            last_event_id: event_id.to_string(),
            created_at: occurred_at,
        }
    }

    pub fn is_entitled(&self) -> bool {
        self.status.is_entitled()
    }

    /// Fold one event observation into the record.
    ///
    /// - An event at or before `last_event_at` leaves the record untouched,
    ///   marker included, so callers can detect the duplicate.
    /// - A newer event always advances the marker, but a terminal record
    ///   keeps its status: a late "charge succeeded" must not resurrect a
    ///   subscription already ended by a later event.
    pub fn observe(
        mut self,
        target: SubscriptionStatus,
        period_end: Option<i64>,
        event_id: &str,
        occurred_at: i64,
    ) -> Self {
        if occurred_at <= self.last_event_at {
            return self;
        }

        self.last_event_at = occurred_at;
        self.last_event_id = event_id.to_string();

        if self.status.is_terminal() {
            return self;
        }

        if let Some(end) = period_end {
            self.current_period_end = Some(end);
        }
        self.status = target;
        self
    }

    /// Retire this record because the same subscriber activated a newer
    /// subscription. Forces `canceled` even against the stale-event guard —
    /// the single-entitlement invariant outranks event ordering here.
    pub fn superseded_by(mut self, event_id: &str, occurred_at: i64) -> Self {
        self.status = SubscriptionStatus::Canceled;
        if occurred_at > self.last_event_at {
            self.last_event_at = occurred_at;
            self.last_event_id = event_id.to_string();
        }
        self
    }
}
