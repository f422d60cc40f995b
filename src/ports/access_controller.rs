//! Access controller port.
//!
//! Wraps the messaging platform's group-management API: issuing single-use
//! join tokens and removing members. Both operations are fire-and-forget
//! from the engine's perspective; their outcome lands in the `EffectReport`
//! but never blocks persistence of billing truth.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::SubscriberId;

/// A credential admitting one join to the restricted group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The invite URL handed to the subscriber.
    pub invite_link: String,

    /// False when this is the configured static fallback link rather than a
    /// freshly minted single-use one.
    pub single_use: bool,
}

#[derive(Debug, Error)]
pub enum AccessError {
    /// The group-management API could not be reached or answered 5xx, and
    /// no fallback token is configured.
    #[error("access provider unavailable: {0}")]
    Unavailable(String),

    /// The API rejected the request (bad group id, malformed subscriber id).
    #[error("access provider rejected request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait AccessController: Send + Sync {
    /// Issue a single-use token admitting the subscriber to the group.
    async fn grant(&self, subscriber: &SubscriberId) -> Result<AccessToken, AccessError>;

    /// Remove the subscriber from the group. Implemented as a temporary
    /// exclusion (exclude, then immediately lift it) so the subscriber can
    /// rejoin after a future purchase.
    async fn revoke(&self, subscriber: &SubscriberId) -> Result<(), AccessError>;
}
