//! JSON File Subscription Store Adapter
//!
//! Keeps the full record map in memory and snapshots it to a single JSON
//! file after every mutation. The snapshot is written to a sibling temp
//! file and renamed into place so a crash mid-write never leaves a torn
//! file behind. Suited to the small record counts this service handles.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::subscription::{SubscriberId, SubscriptionId, SubscriptionRecord};
use crate::ports::{Mutation, RecordMutator, StoreError, SubscriptionStore};

use super::in_memory::best_for_subscriber;

pub struct JsonFileSubscriptionStore {
    path: PathBuf,
    records: Mutex<HashMap<SubscriptionId, SubscriptionRecord>>,
}

impl JsonFileSubscriptionStore {
    /// Open the store, loading an existing snapshot if one is present.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupted(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Persist the current map. Called with the record lock held, so
    /// snapshots are serialized with mutations.
    async fn flush(
        &self,
        records: &HashMap<SubscriptionId, SubscriptionRecord>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for JsonFileSubscriptionStore {
    async fn get(&self, id: &SubscriptionId) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn upsert(
        &self,
        id: &SubscriptionId,
        mutate: RecordMutator,
    ) -> Result<Mutation, StoreError> {
        let mut records = self.records.lock().await;
        let previous = records.get(id).cloned();
        let current = mutate(previous.clone());
        records.insert(id.clone(), current.clone());
        self.flush(&records).await?;
        Ok(Mutation { previous, current })
    }

    async fn find_by_subscriber(
        &self,
        subscriber: &SubscriberId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(best_for_subscriber(records.values(), subscriber))
    }

    async fn list_all(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        Ok(self.records.lock().await.values().cloned().collect())
    }
}
