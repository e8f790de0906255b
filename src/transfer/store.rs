// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-process [`TransferStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::record::TransferRecord;
use crate::error::{BridgeError, Result};
use crate::traits::TransferStore;

/// Keeps records in memory; suitable for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryTransferStore {
    records: RwLock<HashMap<String, TransferRecord>>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(BridgeError::InvalidRequest(format!(
                "transfer {} already exists",
                record.id
            )));
        }

        debug!(transfer_id = %record.id, event = "transfer_record_created");
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<Option<TransferRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TransferRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.matches_hash(hash))
            .cloned())
    }

    async fn update(&self, mut record: TransferRecord) -> Result<TransferRecord> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| BridgeError::TransferNotFound(record.id.clone()))?;

        if stored.version != record.version {
            return Err(BridgeError::ConcurrentModification {
                transfer_id: record.id,
                expected: record.version,
            });
        }

        record.version += 1;
        record.updated_at = Utc::now();
        *stored = record.clone();

        debug!(
            transfer_id = %record.id,
            status = %record.status,
            version = record.version,
            event = "transfer_record_updated"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferStatus;

    fn record() -> TransferRecord {
        TransferRecord::builder()
            .source_chain("ethereum")
            .destination_chain("base")
            .amount(1_000_000)
            .source_address("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .destination_address("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .build()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryTransferStore::new();
        let created = store.create(record()).await.unwrap();

        let found = store.find(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(store.find("missing").await.unwrap().is_none());
        assert!(store.create(created).await.is_err());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemoryTransferStore::new();
        let mut record = store.create(record()).await.unwrap();
        record.transition_to(TransferStatus::Pending).unwrap();

        let updated = store.update(record).await.unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(
            store.find(&updated.id).await.unwrap().unwrap().status,
            TransferStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_stale_update_rejected() {
        let store = InMemoryTransferStore::new();
        let record = store.create(record()).await.unwrap();

        let mut first = record.clone();
        first.transition_to(TransferStatus::Pending).unwrap();
        store.update(first).await.unwrap();

        let mut second = record;
        second.transition_to(TransferStatus::Failed).unwrap();
        let err = store.update(second).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ConcurrentModification { expected: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_find_by_hash() {
        let store = InMemoryTransferStore::new();
        let mut record = record();
        record.burn_tx_hash = Some("0xBEEF".into());
        let record = store.create(record).await.unwrap();

        let found = store.find_by_hash("0xbeef").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert!(store.find_by_hash("0xdead").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_record() {
        let store = InMemoryTransferStore::new();
        assert!(matches!(
            store.update(record()).await,
            Err(BridgeError::TransferNotFound(_))
        ));
    }
}
