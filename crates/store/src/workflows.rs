//! Workflow definition storage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{models::WorkflowRecord, StoreError};

/// Storage contract for workflow definitions.
///
/// `record_run` exists so the statistics update is a single atomic
/// operation inside the store — callers never read-modify-write the
/// counter themselves.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert a new record; fails with `Conflict` if the id is taken.
    async fn insert(&self, record: WorkflowRecord) -> Result<(), StoreError>;

    /// Fetch a single record by its primary key.
    async fn get(&self, id: Uuid) -> Result<WorkflowRecord, StoreError>;

    /// Return all records ordered by creation time (newest first).
    async fn list(&self) -> Result<Vec<WorkflowRecord>, StoreError>;

    /// Replace an existing record.
    async fn update(&self, record: WorkflowRecord) -> Result<(), StoreError>;

    /// Permanently delete a record by its primary key.
    async fn remove(&self, id: Uuid) -> Result<(), StoreError>;

    /// Increment `execution_count` and set `last_executed_at`.
    async fn record_run(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// In-memory `WorkflowStore` backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    records: RwLock<HashMap<Uuid, WorkflowRecord>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn insert(&self, record: WorkflowRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Conflict(format!(
                "workflow {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<WorkflowRecord, StoreError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<WorkflowRecord>, StoreError> {
        let mut records: Vec<WorkflowRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update(&self, record: WorkflowRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn record_run(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.execution_count += 1;
        record.last_executed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str) -> WorkflowRecord {
        let now = Utc::now();
        WorkflowRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            definition: json!({}),
            enabled: true,
            execution_count: 0,
            last_executed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryWorkflowStore::new();
        let rec = record("wf");
        let id = rec.id;
        store.insert(rec).await.unwrap();

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.name, "wf");
        assert_eq!(fetched.execution_count, 0);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let store = MemoryWorkflowStore::new();
        let rec = record("wf");
        store.insert(rec.clone()).await.unwrap();
        assert!(matches!(
            store.insert(rec).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn record_run_bumps_counter_and_timestamp() {
        let store = MemoryWorkflowStore::new();
        let rec = record("wf");
        let id = rec.id;
        store.insert(rec).await.unwrap();

        let at = Utc::now();
        store.record_run(id, at).await.unwrap();
        store.record_run(id, at).await.unwrap();

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.execution_count, 2);
        assert_eq!(fetched.last_executed_at, Some(at));
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let store = MemoryWorkflowStore::new();
        assert!(matches!(
            store.remove(Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
    }
}
