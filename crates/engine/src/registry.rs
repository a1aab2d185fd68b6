//! Workflow registry — definition CRUD plus binding lifecycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use store::{StoreError, WebhookBinding, WorkflowStore};

use crate::binder::TriggerBinder;
use crate::models::{Workflow, WorkflowDefinition, WorkflowPatch};
use crate::validate::validate_definition;
use crate::EngineError;

/// Owns workflow definitions and delegates binding lifecycle to the
/// [`TriggerBinder`].  All operations validate before persisting, so
/// configuration errors never reach run time.
pub struct WorkflowRegistry {
    workflows: Arc<dyn WorkflowStore>,
    binder: Arc<TriggerBinder>,
}

impl WorkflowRegistry {
    pub fn new(workflows: Arc<dyn WorkflowStore>, binder: Arc<TriggerBinder>) -> Self {
        Self { workflows, binder }
    }

    /// Create a workflow: assign an id, default `enabled`, zero the stats,
    /// persist, then bind the trigger.
    pub async fn create(&self, definition: WorkflowDefinition) -> Result<Workflow, EngineError> {
        validate_definition(
            &definition.name,
            &definition.trigger,
            &definition.conditions,
            &definition.actions,
        )?;

        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            name: definition.name,
            description: definition.description,
            trigger: definition.trigger,
            conditions: definition.conditions,
            actions: definition.actions,
            enabled: definition.enabled,
            execution_count: 0,
            last_executed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.workflows.insert(workflow.to_record()?).await?;
        if let Err(e) = self.binder.bind(&workflow).await {
            // Binding failed after the insert; roll back so no workflow is
            // left without the binding its trigger declares.
            let _ = self.workflows.remove(workflow.id).await;
            return Err(e);
        }

        info!(workflow_id = %workflow.id, name = %workflow.name, "workflow created");
        Ok(workflow)
    }

    /// Apply a partial patch.  Fields omitted from the patch are unchanged.
    /// A trigger change unbinds the previous trigger before binding the new
    /// one.
    pub async fn update(&self, id: Uuid, patch: WorkflowPatch) -> Result<Workflow, EngineError> {
        let record = self
            .workflows
            .get(id)
            .await
            .map_err(not_found)?;
        let mut workflow = Workflow::from_record(&record)?;

        let trigger_changed = patch.trigger.is_some();
        if let Some(name) = patch.name {
            workflow.name = name;
        }
        if let Some(description) = patch.description {
            workflow.description = Some(description);
        }
        if let Some(trigger) = patch.trigger {
            workflow.trigger = trigger;
        }
        if let Some(conditions) = patch.conditions {
            workflow.conditions = conditions;
        }
        if let Some(actions) = patch.actions {
            workflow.actions = actions;
        }
        if let Some(enabled) = patch.enabled {
            workflow.enabled = enabled;
        }
        workflow.updated_at = Utc::now();

        validate_definition(
            &workflow.name,
            &workflow.trigger,
            &workflow.conditions,
            &workflow.actions,
        )?;

        self.workflows.update(workflow.to_record()?).await?;
        if trigger_changed {
            self.binder.rebind(&workflow).await?;
        }

        info!(workflow_id = %id, "workflow updated");
        Ok(workflow)
    }

    /// Delete a workflow.  Bindings are removed *first* — a deleted
    /// workflow must never leave a live webhook or schedule behind.
    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        self.workflows.get(id).await.map_err(not_found)?;
        self.binder.unbind(id).await;
        self.workflows.remove(id).await?;
        info!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Workflow, EngineError> {
        let record = self.workflows.get(id).await.map_err(not_found)?;
        Workflow::from_record(&record)
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, EngineError> {
        self.workflows
            .list()
            .await?
            .iter()
            .map(Workflow::from_record)
            .collect()
    }

    /// The webhook endpoint advertised for a workflow, if its trigger is a
    /// webhook.
    pub async fn webhook_binding(&self, id: Uuid) -> Option<WebhookBinding> {
        self.binder.webhook_binding(id).await
    }
}

fn not_found(e: StoreError) -> EngineError {
    match e {
        StoreError::NotFound => EngineError::WorkflowNotFound,
        other => EngineError::Store(other),
    }
}
