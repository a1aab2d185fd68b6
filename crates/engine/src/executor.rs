//! Workflow execution engine.
//!
//! `ExecutionEngine` is the central orchestrator for one run:
//! 1. Rejects triggers for absent or disabled workflows before any record
//!    exists.
//! 2. Evaluates conditions; an unmet condition skips the run, a broken
//!    condition fails it.
//! 3. Dispatches actions strictly in declared order, interpolating each
//!    action's parameters against the trigger payload and prior step
//!    outputs.
//! 4. Appends the terminal record to the execution ledger and updates the
//!    workflow's counters (`completed`/`failed` only).
//!
//! Runs of *different* workflows proceed concurrently; runs of the *same*
//! workflow are serialized through a per-workflow mutex, so counter updates
//! never race and overlapping triggers queue instead of interleaving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use actions::{Action, ActionContext, ActionError, ActionKind, HandlerRegistry};
use store::{
    BindingStore, ExecutionLedger, ExecutionRecord, ExecutionStatus, StepRecord, WorkflowStore,
};

use crate::condition;
use crate::models::Workflow;
use crate::template;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline for a single action dispatch; overruns are recorded as a
    /// `timeout` failure, distinct from a handler error.
    pub action_timeout: Duration,
    /// Deadline for a whole run, checked between action boundaries.
    pub run_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(300),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionEngine
// ---------------------------------------------------------------------------

pub struct ExecutionEngine {
    workflows: Arc<dyn WorkflowStore>,
    bindings: Arc<dyn BindingStore>,
    ledger: Arc<dyn ExecutionLedger>,
    handlers: Arc<HandlerRegistry>,
    config: ExecutorConfig,
    /// One mutex per workflow id; holding it makes a run single-flight for
    /// that workflow without serializing unrelated workflows.
    run_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    /// Cooperative cancellation flags for in-flight runs.
    cancellations: Mutex<HashMap<Uuid, RunHandle>>,
}

struct RunHandle {
    workflow_id: Uuid,
    cancelled: Arc<AtomicBool>,
}

impl ExecutionEngine {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        bindings: Arc<dyn BindingStore>,
        ledger: Arc<dyn ExecutionLedger>,
        handlers: Arc<HandlerRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            workflows,
            bindings,
            ledger,
            handlers,
            config,
            run_locks: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// Trigger a run by workflow id (manual/API invocation, schedule fire,
    /// or a resolved webhook).
    ///
    /// # Errors
    /// `WorkflowNotFound` / `WorkflowDisabled` are rejected before any
    /// execution record exists; store errors surface as `Store`.
    #[instrument(skip(self, payload), fields(workflow_id = %workflow_id))]
    pub async fn trigger(
        &self,
        workflow_id: Uuid,
        payload: Value,
    ) -> Result<ExecutionRecord, EngineError> {
        let record = self
            .workflows
            .get(workflow_id)
            .await
            .map_err(|_| EngineError::WorkflowNotFound)?;
        if !record.enabled {
            return Err(EngineError::WorkflowDisabled);
        }
        let workflow = Workflow::from_record(&record)?;

        let lock = self.run_lock(workflow_id).await;
        let _guard = lock.lock().await;

        let execution_id = Uuid::new_v4();
        let cancelled = Arc::new(AtomicBool::new(false));
        self.cancellations.lock().await.insert(
            execution_id,
            RunHandle {
                workflow_id,
                cancelled: cancelled.clone(),
            },
        );

        let execution = self.run(execution_id, &workflow, payload, &cancelled).await;

        self.cancellations.lock().await.remove(&execution_id);

        self.ledger.append(execution.clone()).await?;
        if matches!(
            execution.status,
            ExecutionStatus::Completed | ExecutionStatus::Failed
        ) {
            let at = execution.completed_at.unwrap_or_else(Utc::now);
            self.workflows.record_run(workflow_id, at).await?;
        }

        info!(execution_id = %execution.id, status = %execution.status, "run finished");
        Ok(execution)
    }

    /// Trigger a run through a webhook binding, enforcing the bound method
    /// and shared secret.
    pub async fn trigger_webhook(
        &self,
        webhook_id: Uuid,
        method: &str,
        secret: Option<&str>,
        payload: Value,
    ) -> Result<ExecutionRecord, EngineError> {
        let binding = self
            .bindings
            .get_webhook(webhook_id)
            .await
            .map_err(|_| EngineError::TriggerNotFound)?;

        if !binding.method.eq_ignore_ascii_case(method) {
            return Err(EngineError::MethodNotAllowed {
                expected: binding.method.clone(),
            });
        }
        if let Some(expected) = &binding.secret {
            if secret != Some(expected.as_str()) {
                return Err(EngineError::InvalidSecret);
            }
        }

        self.trigger(binding.workflow_id, payload).await
    }

    /// Request cooperative cancellation of an in-flight run.  The run stops
    /// at the next action boundary and terminates `failed`.  Returns false
    /// if the execution is not currently running.
    pub async fn cancel(&self, execution_id: Uuid) -> bool {
        match self.cancellations.lock().await.get(&execution_id) {
            Some(handle) => {
                handle.cancelled.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight run of a workflow.  Returns the number of
    /// runs flagged.
    pub async fn cancel_workflow(&self, workflow_id: Uuid) -> usize {
        let cancellations = self.cancellations.lock().await;
        let mut flagged = 0;
        for handle in cancellations.values() {
            if handle.workflow_id == workflow_id {
                handle.cancelled.store(true, Ordering::Relaxed);
                flagged += 1;
            }
        }
        flagged
    }

    async fn run_lock(&self, workflow_id: Uuid) -> Arc<Mutex<()>> {
        self.run_locks
            .lock()
            .await
            .entry(workflow_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // -----------------------------------------------------------------------
    // The run state machine: pending -> running -> {completed|skipped|failed}
    // -----------------------------------------------------------------------

    async fn run(
        &self,
        execution_id: Uuid,
        workflow: &Workflow,
        payload: Value,
        cancelled: &AtomicBool,
    ) -> ExecutionRecord {
        let started_at = Utc::now();
        let mut record = ExecutionRecord {
            id: execution_id,
            workflow_id: workflow.id,
            trigger_payload: payload.clone(),
            status: ExecutionStatus::Pending,
            steps: Vec::new(),
            started_at,
            completed_at: None,
            error: None,
        };
        record.status = ExecutionStatus::Running;

        match condition::evaluate(&workflow.conditions, &payload) {
            Ok(true) => {}
            Ok(false) => {
                return finalize(record, ExecutionStatus::Skipped);
            }
            Err(e) => {
                // A broken condition must not look like an unmet one.
                record.error = Some(e.to_string());
                return finalize(record, ExecutionStatus::Failed);
            }
        }

        let deadline = started_at
            + chrono::Duration::from_std(self.config.run_timeout)
                .unwrap_or(chrono::Duration::MAX);
        let mut context = base_context(&payload);

        for action in &workflow.actions {
            if cancelled.load(Ordering::Relaxed) {
                record.error = Some(ActionError::Cancelled.to_string());
                return finalize(record, ExecutionStatus::Failed);
            }
            if Utc::now() >= deadline {
                record.error = Some("run deadline exceeded".into());
                return finalize(record, ExecutionStatus::Failed);
            }

            let step = self
                .dispatch(action, &context, &payload, workflow.id, execution_id)
                .await;

            if let Some(steps) = context.get_mut("steps").and_then(Value::as_array_mut) {
                steps.push(step.output.clone().unwrap_or(Value::Null));
            }

            let failed = !step.success;
            let step_error = step.error.clone();
            record.steps.push(step);

            if failed && action.stop_on_error {
                warn!(
                    workflow_id = %workflow.id,
                    action = action.kind.tag(),
                    "stop_on_error action failed, halting run"
                );
                record.error = step_error
                    .map(|e| format!("action '{}' failed: {e}", action.kind.tag()));
                return finalize(record, ExecutionStatus::Failed);
            }
        }

        finalize(record, ExecutionStatus::Completed)
    }

    /// Interpolate one action's parameters and dispatch it through the
    /// handler registry, producing a step record either way.
    async fn dispatch(
        &self,
        action: &Action,
        context: &Value,
        payload: &Value,
        workflow_id: Uuid,
        execution_id: Uuid,
    ) -> StepRecord {
        let started_at = Utc::now();
        let outcome = self
            .dispatch_inner(action, context, payload, workflow_id, execution_id)
            .await;
        let completed_at = Utc::now();

        match outcome {
            Ok(output) => StepRecord {
                action_type: action.kind.tag().to_string(),
                started_at,
                completed_at,
                success: true,
                output: Some(output),
                error: None,
            },
            Err(e) => StepRecord {
                action_type: action.kind.tag().to_string(),
                started_at,
                completed_at,
                success: false,
                output: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn dispatch_inner(
        &self,
        action: &Action,
        context: &Value,
        payload: &Value,
        workflow_id: Uuid,
        execution_id: Uuid,
    ) -> Result<Value, ActionError> {
        let raw = serde_json::to_value(&action.kind)
            .map_err(|e| ActionError::Failed(format!("cannot serialise action: {e}")))?;
        let interpolated = template::interpolate_value(&raw, context);
        let kind: ActionKind = serde_json::from_value(interpolated)
            .map_err(|e| ActionError::Failed(format!("interpolated parameters are invalid: {e}")))?;

        let handler = self.handlers.get(kind.tag()).ok_or_else(|| {
            ActionError::Failed(format!(
                "no handler registered for action type '{}'",
                kind.tag()
            ))
        })?;

        let ctx = ActionContext {
            workflow_id,
            execution_id,
            payload: payload.clone(),
            context: context.clone(),
        };

        match tokio::time::timeout(self.config.action_timeout, handler.execute(&kind, &ctx)).await
        {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout),
        }
    }
}

fn finalize(mut record: ExecutionRecord, status: ExecutionStatus) -> ExecutionRecord {
    record.status = status;
    record.completed_at = Some(Utc::now());
    record
}

/// The merged template context: payload fields at the root, the whole
/// payload under `trigger`, and prior step outputs under `steps`.
fn base_context(payload: &Value) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(fields) = payload.as_object() {
        map.extend(fields.clone());
    }
    map.insert("trigger".to_string(), payload.clone());
    map.insert("steps".to_string(), Value::Array(Vec::new()));
    Value::Object(map)
}
