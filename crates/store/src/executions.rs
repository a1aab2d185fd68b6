//! Execution ledger — append-only history of workflow runs.
//!
//! Records arrive exactly once, at their terminal transition, and are never
//! mutated afterwards; readers always get clones.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{models::ExecutionRecord, StoreError};

/// Storage contract for the execution ledger.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Append a terminal execution record.
    async fn append(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    /// Fetch a single record by execution id.
    async fn get(&self, id: Uuid) -> Result<ExecutionRecord, StoreError>;

    /// The most recent `limit` records for one workflow, newest first.
    async fn recent(&self, workflow_id: Uuid, limit: usize) -> Vec<ExecutionRecord>;

    /// The most recent `limit` records across all workflows, newest first.
    async fn recent_all(&self, limit: usize) -> Vec<ExecutionRecord>;

    /// Drop records for one workflow, or all records when `workflow_id` is
    /// `None`.  Returns the number of records removed.
    async fn clear(&self, workflow_id: Option<Uuid>) -> usize;
}

/// In-memory `ExecutionLedger` over an append-only vector.
#[derive(Default)]
pub struct MemoryExecutionLedger {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl MemoryExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionLedger for MemoryExecutionLedger {
    async fn append(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict(format!(
                "execution {} already recorded",
                record.id
            )));
        }
        records.push(record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ExecutionRecord, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn recent(&self, workflow_id: Uuid, limit: usize) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.workflow_id == workflow_id)
            .take(limit)
            .cloned()
            .collect()
    }

    async fn recent_all(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    async fn clear(&self, workflow_id: Option<Uuid>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        match workflow_id {
            Some(id) => records.retain(|r| r.workflow_id != id),
            None => records.clear(),
        }
        let removed = before - records.len();
        debug!(?workflow_id, removed, "execution ledger cleared");
        removed
    }
}
