//! Subscription store port.
//!
//! Durable key-value mapping from subscription id to record with atomic
//! per-key read-modify-write. The mutator pattern is mandatory: the engine
//! never reads, computes, and writes as three unguarded steps, because
//! concurrent webhook deliveries for the same subscription must serialize.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::subscription::{SubscriberId, SubscriptionId, SubscriptionRecord};

/// Failures of the persistence layer. These are the only downstream errors
/// that fail a webhook request — an unrecorded transition must be retried
/// by the provider.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failure: {0}")]
    Io(String),

    #[error("stored data is corrupted: {0}")]
    Corrupted(String),
}

/// Closure applied to the current record (if any) under the store's lock.
/// Must be pure apart from its captured inputs; it may run again on retry.
pub type RecordMutator =
    Box<dyn FnOnce(Option<SubscriptionRecord>) -> SubscriptionRecord + Send>;

/// Outcome of an atomic upsert: the record before and after the mutator ran.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub previous: Option<SubscriptionRecord>,
    pub current: SubscriptionRecord,
}

/// Port over the only mutable shared resource in the system.
///
/// Implementations must guarantee that two concurrent `upsert` calls for the
/// same id serialize, and that a completed `upsert` is durable before it
/// returns.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetch a record by subscription id.
    async fn get(&self, id: &SubscriptionId) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// Atomic read-modify-write for one subscription id.
    async fn upsert(
        &self,
        id: &SubscriptionId,
        mutate: RecordMutator,
    ) -> Result<Mutation, StoreError>;

    /// Look up a subscriber's record, preferring an entitled one when the
    /// subscriber has records from multiple historical subscriptions.
    /// Used to enforce the single-entitlement invariant and by the admin
    /// surface.
    async fn find_by_subscriber(
        &self,
        subscriber: &SubscriberId,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// All records, for the admin surface only.
    async fn list_all(&self) -> Result<Vec<SubscriptionRecord>, StoreError>;
}
