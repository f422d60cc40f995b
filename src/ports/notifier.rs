//! Notifier port.
//!
//! One-way messages to a subscriber on the messaging platform. A failed
//! notification is logged and swallowed — the billing fact it reports
//! already happened and must not be rolled back.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::{Plan, SubscriberId};

/// The message templates the engine can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Purchase confirmed; context usually carries the invite link.
    Confirmed,
    /// Recurring charge went through.
    Renewed,
    /// Subscription ended and membership was removed.
    AccessRemoved,
    /// Purchase confirmed but no invite link could be issued.
    GrantUnavailable,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmed => "confirmed",
            NotificationKind::Renewed => "renewed",
            NotificationKind::AccessRemoved => "access-removed",
            NotificationKind::GrantUnavailable => "grant-unavailable",
        }
    }
}

/// Template interpolation values. All optional; templates degrade gracefully.
#[derive(Debug, Clone, Default)]
pub struct NotificationContext {
    pub plan: Option<Plan>,
    pub invite_link: Option<String>,
    pub period_end: Option<i64>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("message delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("subscriber cannot be addressed: {0}")]
    BadRecipient(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        subscriber: &SubscriberId,
        kind: NotificationKind,
        context: &NotificationContext,
    ) -> Result<(), NotifyError>;
}
