//! Subscription status state machine.
//!
//! Defines the lifecycle states a billing subscription moves through and
//! which of them entitle the subscriber to group membership.

use serde::{Deserialize, Serialize};

/// Status of a billing subscription as reconciled from webhook events.
///
/// Entitlement is derived from this value alone: `Active` entitles,
/// everything else does not. Access decisions are event-driven, never
/// time-driven, so there is no expiry sweep promoting states on a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// First payment not yet confirmed. No access.
    Pending,

    /// Paid and current. Entitled to group membership.
    Active,

    /// A recurring charge failed. Not entitled, but membership is not
    /// revoked either; the provider will retry the charge.
    PastDue,

    /// Subscription ended. Terminal for this subscription id; a subscriber
    /// who repurchases gets a fresh record under a new id.
    Canceled,
}

impl SubscriptionStatus {
    /// True iff this status entitles the subscriber to group membership.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// True iff no later event may move the record out of this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
    }

    /// True iff the subscriber is presumed to currently hold membership.
    ///
    /// `PastDue` counts: the grant happened while active and no revocation
    /// fires on a failed charge, so the member is still in the group.
    pub fn holds_membership(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }

    /// Stable wire token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_is_entitled() {
        assert!(SubscriptionStatus::Active.is_entitled());
        assert!(!SubscriptionStatus::Pending.is_entitled());
        assert!(!SubscriptionStatus::PastDue.is_entitled());
        assert!(!SubscriptionStatus::Canceled.is_entitled());
    }

    #[test]
    fn only_canceled_is_terminal() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
        assert!(!SubscriptionStatus::Active.is_terminal());
        assert!(!SubscriptionStatus::PastDue.is_terminal());
        assert!(!SubscriptionStatus::Pending.is_terminal());
    }

    #[test]
    fn past_due_still_holds_membership() {
        assert!(SubscriptionStatus::PastDue.holds_membership());
        assert!(SubscriptionStatus::Active.holds_membership());
        assert!(!SubscriptionStatus::Pending.holds_membership());
        assert!(!SubscriptionStatus::Canceled.holds_membership());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");

        let parsed: SubscriptionStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(parsed, SubscriptionStatus::Canceled);
    }
}
