//! In-memory Subscription Store Adapter
//!
//! Default store when no snapshot path is configured. State is lost on
//! restart, which is acceptable for development and for deployments that
//! treat the billing provider as the source of truth.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::subscription::{SubscriberId, SubscriptionId, SubscriptionRecord};
use crate::ports::{Mutation, RecordMutator, StoreError, SubscriptionStore};

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<SubscriptionId, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pick the record that best represents a subscriber: an entitled one wins,
/// ties broken by the most recently observed event.
pub(crate) fn best_for_subscriber<'a, I>(records: I, subscriber: &SubscriberId) -> Option<SubscriptionRecord>
where
    I: Iterator<Item = &'a SubscriptionRecord>,
{
    records
        .filter(|r| &r.subscriber_id == subscriber)
        .max_by_key(|r| (r.is_entitled(), r.last_event_at))
        .cloned()
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, id: &SubscriptionId) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(
        &self,
        id: &SubscriptionId,
        mutate: RecordMutator,
    ) -> Result<Mutation, StoreError> {
        let mut records = self.records.write().await;
        let previous = records.get(id).cloned();
        let current = mutate(previous.clone());
        records.insert(id.clone(), current.clone());
        Ok(Mutation { previous, current })
    }

    async fn find_by_subscriber(
        &self,
        subscriber: &SubscriberId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(best_for_subscriber(records.values(), subscriber))
    }

    async fn list_all(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::{Plan, SubscriptionStatus};
    use std::sync::Arc;

    fn record(id: &str, subscriber: &str, status: SubscriptionStatus, at: i64) -> SubscriptionRecord {
        SubscriptionRecord {
            subscription_id: SubscriptionId::new(id),
            subscriber_id: SubscriberId::new(subscriber),
            plan: Plan::Monthly,
            status,
            current_period_end: None,
            last_event_at: at,
            last_event_id: format!("evt_{at}"),
            created_at: at,
        }
    }

    async fn seed(store: &InMemorySubscriptionStore, rec: SubscriptionRecord) {
        let id = rec.subscription_id.clone();
        store
            .upsert(&id, Box::new(move |_| rec))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upsert_reports_previous_and_current() {
        let store = InMemorySubscriptionStore::new();
        let id = SubscriptionId::new("sub_1");

        let first = store
            .upsert(
                &id,
                Box::new(|_| record("sub_1", "42", SubscriptionStatus::Active, 100)),
            )
            .await
            .unwrap();
        assert!(first.previous.is_none());

        let second = store
            .upsert(
                &id,
                Box::new(|existing| {
                    let mut rec = existing.unwrap();
                    rec.status = SubscriptionStatus::PastDue;
                    rec
                }),
            )
            .await
            .unwrap();
        assert_eq!(second.previous.unwrap().status, SubscriptionStatus::Active);
        assert_eq!(second.current.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn get_returns_stored_record() {
        let store = InMemorySubscriptionStore::new();
        seed(&store, record("sub_1", "42", SubscriptionStatus::Active, 100)).await;

        let found = store.get(&SubscriptionId::new("sub_1")).await.unwrap();
        assert_eq!(found.unwrap().subscriber_id, SubscriberId::new("42"));
        assert!(store.get(&SubscriptionId::new("sub_2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_subscriber_prefers_entitled_record() {
        let store = InMemorySubscriptionStore::new();
        seed(&store, record("sub_old", "42", SubscriptionStatus::Canceled, 500)).await;
        seed(&store, record("sub_new", "42", SubscriptionStatus::Active, 100)).await;

        let found = store
            .find_by_subscriber(&SubscriberId::new("42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.subscription_id, SubscriptionId::new("sub_new"));
    }

    #[tokio::test]
    async fn find_by_subscriber_falls_back_to_most_recent() {
        let store = InMemorySubscriptionStore::new();
        seed(&store, record("sub_a", "42", SubscriptionStatus::Canceled, 100)).await;
        seed(&store, record("sub_b", "42", SubscriptionStatus::Canceled, 300)).await;

        let found = store
            .find_by_subscriber(&SubscriberId::new("42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.subscription_id, SubscriptionId::new("sub_b"));
    }

    #[tokio::test]
    async fn concurrent_upserts_for_one_id_serialize() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let id = SubscriptionId::new("sub_1");
        seed(&store, record("sub_1", "42", SubscriptionStatus::Active, 0)).await;

        let mut tasks = Vec::new();
        for ts in 1..=20i64 {
            let store = store.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .upsert(
                        &id,
                        Box::new(move |existing| {
                            let mut rec = existing.unwrap();
                            rec.last_event_at = rec.last_event_at.max(ts);
                            rec
                        }),
                    )
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let final_record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(final_record.last_event_at, 20);
    }

    #[tokio::test]
    async fn list_all_returns_every_record() {
        let store = InMemorySubscriptionStore::new();
        seed(&store, record("sub_1", "42", SubscriptionStatus::Active, 100)).await;
        seed(&store, record("sub_2", "43", SubscriptionStatus::Canceled, 200)).await;

        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }
}
