//! Trigger binding lifecycle.
//!
//! Binds a workflow's declared trigger to the external mechanism that can
//! fire it: an addressable webhook path, a schedule entry, or a data-change
//! subscription.  Webhook and schedule binding ids are derived
//! deterministically from the workflow id, so repeated binding attempts are
//! idempotent.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use actions::DataOperation;
use store::{BindingStore, DataChangeBinding, ScheduleBinding, WebhookBinding};

use crate::condition;
use crate::models::{Condition, Trigger, Workflow};
use crate::scheduler::{compute_next_run, Clock};
use crate::EngineError;

// Namespaces for UUIDv5 binding-id derivation.
const WEBHOOK_NAMESPACE: Uuid = Uuid::from_u128(0x8c5c_1a4e_2b0f_4b7a_9e3d_6f21_7c84_0a11);
const SCHEDULE_NAMESPACE: Uuid = Uuid::from_u128(0x8c5c_1a4e_2b0f_4b7a_9e3d_6f21_7c84_0a12);
const DATA_CHANGE_NAMESPACE: Uuid = Uuid::from_u128(0x8c5c_1a4e_2b0f_4b7a_9e3d_6f21_7c84_0a13);

pub struct TriggerBinder {
    bindings: Arc<dyn BindingStore>,
    clock: Arc<dyn Clock>,
}

impl TriggerBinder {
    pub fn new(bindings: Arc<dyn BindingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { bindings, clock }
    }

    /// The webhook id (and path segment) a workflow binds to.
    pub fn webhook_id(workflow_id: Uuid) -> Uuid {
        Uuid::new_v5(&WEBHOOK_NAMESPACE, workflow_id.as_bytes())
    }

    /// Create the binding for the workflow's declared trigger.
    /// `manual` and `api` triggers need no binding.
    pub async fn bind(&self, workflow: &Workflow) -> Result<(), EngineError> {
        match &workflow.trigger {
            Trigger::Webhook { method, headers, secret } => {
                let id = Self::webhook_id(workflow.id);
                let binding = WebhookBinding {
                    id,
                    workflow_id: workflow.id,
                    path: format!("/api/webhooks/{id}"),
                    method: method.to_uppercase(),
                    headers: headers.clone(),
                    secret: secret.clone(),
                };
                debug!(workflow_id = %workflow.id, path = %binding.path, "webhook bound");
                self.bindings.put_webhook(binding).await?;
            }
            Trigger::Schedule { expression, timezone } => {
                let next_run_at = compute_next_run(expression, timezone, self.clock.now())?;
                let binding = ScheduleBinding {
                    id: Uuid::new_v5(&SCHEDULE_NAMESPACE, workflow.id.as_bytes()),
                    workflow_id: workflow.id,
                    expression: expression.clone(),
                    timezone: timezone.clone(),
                    next_run_at,
                    enabled: true,
                };
                debug!(workflow_id = %workflow.id, %next_run_at, "schedule bound");
                self.bindings.put_schedule(binding).await?;
            }
            Trigger::DataChange { table, operation, conditions } => {
                let binding = DataChangeBinding {
                    id: Uuid::new_v5(&DATA_CHANGE_NAMESPACE, workflow.id.as_bytes()),
                    workflow_id: workflow.id,
                    table: table.clone(),
                    operation: operation.to_string(),
                    conditions: serde_json::to_value(conditions).map_err(|e| {
                        EngineError::Configuration(format!("cannot serialise conditions: {e}"))
                    })?,
                };
                self.bindings.put_data_change(binding).await?;
            }
            Trigger::Manual | Trigger::Api => {}
        }
        Ok(())
    }

    /// Remove every binding owned by the workflow.
    pub async fn unbind(&self, workflow_id: Uuid) {
        self.bindings.remove_for_workflow(workflow_id).await;
    }

    /// Replace the workflow's bindings after a trigger change.
    pub async fn rebind(&self, workflow: &Workflow) -> Result<(), EngineError> {
        self.unbind(workflow.id).await;
        self.bind(workflow).await
    }

    /// The webhook binding currently advertised for a workflow, if any.
    pub async fn webhook_binding(&self, workflow_id: Uuid) -> Option<WebhookBinding> {
        self.bindings.webhook_for_workflow(workflow_id).await
    }

    /// Which workflows a data mutation should trigger.  Called by an
    /// external change-data-capture collaborator; this binder never watches
    /// a data store itself.
    pub async fn match_data_change(
        &self,
        table: &str,
        operation: DataOperation,
        record: &Value,
    ) -> Vec<Uuid> {
        let operation = operation.to_string();
        let mut matched = Vec::new();

        for binding in self.bindings.data_change_bindings().await {
            if binding.table != table || binding.operation != operation {
                continue;
            }
            let conditions: Vec<Condition> =
                match serde_json::from_value(binding.conditions.clone()) {
                    Ok(conditions) => conditions,
                    Err(_) => continue,
                };
            if condition::evaluate(&conditions, record).unwrap_or(false) {
                matched.push(binding.workflow_id);
            }
        }
        matched
    }
}
