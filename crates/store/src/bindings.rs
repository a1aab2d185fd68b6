//! Trigger binding storage.
//!
//! One store covers all three binding kinds; a workflow owns at most one
//! binding of the trigger it currently declares, and unbinding a workflow
//! removes every kind at once.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{DataChangeBinding, ScheduleBinding, WebhookBinding},
    StoreError,
};

/// Storage contract for trigger bindings.
#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn put_webhook(&self, binding: WebhookBinding) -> Result<(), StoreError>;
    async fn get_webhook(&self, id: Uuid) -> Result<WebhookBinding, StoreError>;
    async fn webhook_for_workflow(&self, workflow_id: Uuid) -> Option<WebhookBinding>;

    async fn put_schedule(&self, binding: ScheduleBinding) -> Result<(), StoreError>;
    async fn schedules(&self) -> Vec<ScheduleBinding>;
    /// Persist a recomputed fire time after a schedule fires.
    async fn set_next_run(&self, id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn put_data_change(&self, binding: DataChangeBinding) -> Result<(), StoreError>;
    async fn data_change_bindings(&self) -> Vec<DataChangeBinding>;

    /// Remove every binding (all kinds) owned by the workflow.
    async fn remove_for_workflow(&self, workflow_id: Uuid);
}

/// In-memory `BindingStore`, one map per binding kind.
#[derive(Default)]
pub struct MemoryBindingStore {
    webhooks: RwLock<HashMap<Uuid, WebhookBinding>>,
    schedules: RwLock<HashMap<Uuid, ScheduleBinding>>,
    data_changes: RwLock<HashMap<Uuid, DataChangeBinding>>,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn put_webhook(&self, binding: WebhookBinding) -> Result<(), StoreError> {
        self.webhooks.write().await.insert(binding.id, binding);
        Ok(())
    }

    async fn get_webhook(&self, id: Uuid) -> Result<WebhookBinding, StoreError> {
        self.webhooks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn webhook_for_workflow(&self, workflow_id: Uuid) -> Option<WebhookBinding> {
        self.webhooks
            .read()
            .await
            .values()
            .find(|b| b.workflow_id == workflow_id)
            .cloned()
    }

    async fn put_schedule(&self, binding: ScheduleBinding) -> Result<(), StoreError> {
        self.schedules.write().await.insert(binding.id, binding);
        Ok(())
    }

    async fn schedules(&self) -> Vec<ScheduleBinding> {
        self.schedules.read().await.values().cloned().collect()
    }

    async fn set_next_run(&self, id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut schedules = self.schedules.write().await;
        let binding = schedules.get_mut(&id).ok_or(StoreError::NotFound)?;
        binding.next_run_at = next_run_at;
        Ok(())
    }

    async fn put_data_change(&self, binding: DataChangeBinding) -> Result<(), StoreError> {
        self.data_changes.write().await.insert(binding.id, binding);
        Ok(())
    }

    async fn data_change_bindings(&self) -> Vec<DataChangeBinding> {
        self.data_changes.read().await.values().cloned().collect()
    }

    async fn remove_for_workflow(&self, workflow_id: Uuid) {
        self.webhooks
            .write()
            .await
            .retain(|_, b| b.workflow_id != workflow_id);
        self.schedules
            .write()
            .await
            .retain(|_, b| b.workflow_id != workflow_id);
        self.data_changes
            .write()
            .await
            .retain(|_, b| b.workflow_id != workflow_id);
    }
}
