//! Integration tests for the execution engine.
//!
//! These use `MockHandler` and the in-memory stores, so no network or
//! database is required.  Each test builds a full engine (stores + handler
//! registry) and drives it through `trigger`/`trigger_webhook`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use actions::mock::MockHandler;
use actions::{Action, ActionKind, HandlerRegistry};
use store::{
    BindingStore, ExecutionLedger, ExecutionStatus, MemoryBindingStore, MemoryExecutionLedger,
    MemoryWorkflowStore, WorkflowStore,
};

use crate::models::{Condition, Operator, Trigger, WorkflowDefinition};
use crate::scheduler::{Clock, ManualClock};
use crate::{
    EngineError, ExecutionEngine, ExecutorConfig, Scheduler, TriggerBinder, WorkflowRegistry,
};

struct Harness {
    registry: WorkflowRegistry,
    engine: Arc<ExecutionEngine>,
    binder: Arc<TriggerBinder>,
    workflows: Arc<MemoryWorkflowStore>,
    bindings: Arc<MemoryBindingStore>,
    ledger: Arc<MemoryExecutionLedger>,
    clock: Arc<ManualClock>,
}

fn harness_with(handlers: HandlerRegistry, config: ExecutorConfig) -> Harness {
    let workflows = Arc::new(MemoryWorkflowStore::new());
    let bindings = Arc::new(MemoryBindingStore::new());
    let ledger = Arc::new(MemoryExecutionLedger::new());
    let clock = Arc::new(ManualClock::at(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let binder = Arc::new(TriggerBinder::new(bindings.clone(), clock.clone()));
    let registry = WorkflowRegistry::new(workflows.clone(), binder.clone());
    let engine = Arc::new(ExecutionEngine::new(
        workflows.clone(),
        bindings.clone(),
        ledger.clone(),
        Arc::new(handlers),
        config,
    ));
    Harness {
        registry,
        engine,
        binder,
        workflows,
        bindings,
        ledger,
        clock,
    }
}

fn harness(handlers: HandlerRegistry) -> Harness {
    harness_with(handlers, ExecutorConfig::default())
}

fn notification(message: &str, stop_on_error: bool) -> Action {
    Action {
        kind: ActionKind::Notification {
            title: "t".into(),
            message: message.into(),
            recipient: None,
        },
        stop_on_error,
    }
}

fn manual_definition(name: &str, actions: Vec<Action>) -> WorkflowDefinition {
    WorkflowDefinition {
        name: name.into(),
        description: None,
        trigger: Trigger::Manual,
        conditions: vec![],
        actions,
        enabled: true,
    }
}

// ============================================================
// stop_on_error asymmetry
// ============================================================

#[tokio::test]
async fn stop_on_error_halts_after_the_failing_step() {
    let failing = Arc::new(MockHandler::failing("boom", "smtp down"));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", failing.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition(
            "halt",
            vec![notification("first", true), notification("never", true)],
        ))
        .await
        .unwrap();

    let execution = h.engine.trigger(wf.id, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.steps.len(), 1);
    assert!(!execution.steps[0].success);
    assert!(execution.error.as_deref().unwrap().contains("smtp down"));
    // The second action never reached the handler.
    assert_eq!(failing.call_count(), 1);
}

#[tokio::test]
async fn non_stopping_failures_still_complete_the_run() {
    let failing = Arc::new(MockHandler::failing("boom", "smtp down"));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", failing.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition(
            "continue",
            vec![notification("first", false), notification("second", false)],
        ))
        .await
        .unwrap();

    let execution = h.engine.trigger(wf.id, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.steps.len(), 2);
    assert!(execution.steps.iter().all(|s| !s.success));
    assert_eq!(failing.call_count(), 2);
}

// ============================================================
// Conditions: skip vs fail
// ============================================================

#[tokio::test]
async fn unmet_conditions_skip_without_running_actions_or_counting() {
    let mock = Arc::new(MockHandler::returning("n", json!({"sent": true})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock.clone());

    let h = harness(handlers);
    let mut definition = manual_definition("gated", vec![notification("hi", false)]);
    definition.conditions = vec![Condition {
        field: "severity".into(),
        operator: Operator::Equals,
        value: json!("high"),
    }];
    let wf = h.registry.create(definition).await.unwrap();

    let execution = h
        .engine
        .trigger(wf.id, json!({"severity": "low"}))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Skipped);
    assert!(execution.steps.is_empty());
    assert_eq!(mock.call_count(), 0);

    // Skipped runs are in the ledger but do not count as executions.
    assert_eq!(h.ledger.recent(wf.id, 10).await.len(), 1);
    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 0);
    assert!(h.workflows.get(wf.id).await.unwrap().last_executed_at.is_none());
}

#[tokio::test]
async fn met_conditions_proceed() {
    let mock = Arc::new(MockHandler::returning("n", json!({"sent": true})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock.clone());

    let h = harness(handlers);
    let mut definition = manual_definition("gated", vec![notification("hi", false)]);
    definition.conditions = vec![Condition {
        field: "age".into(),
        operator: Operator::GreaterThan,
        value: json!(18),
    }];
    let wf = h.registry.create(definition).await.unwrap();

    let execution = h.engine.trigger(wf.id, json!({"age": 20})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(mock.call_count(), 1);
    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 1);
}

#[tokio::test]
async fn broken_condition_fails_the_run_instead_of_skipping() {
    let mock = Arc::new(MockHandler::returning("n", json!({})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition("broken", vec![notification("hi", false)]))
        .await
        .unwrap();

    // Corrupt the stored conditions directly — validation prevents this via
    // the API, but a broken condition at run time must fail, not skip.
    let mut record = h.workflows.get(wf.id).await.unwrap();
    record.definition["conditions"] =
        json!([{"field": "x", "operator": "fuzzy_match", "value": 1}]);
    h.workflows.update(record).await.unwrap();

    let execution = h.engine.trigger(wf.id, json!({"x": 1})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.as_deref().unwrap().contains("operator"));
    assert!(execution.steps.is_empty());
    assert_eq!(mock.call_count(), 0);
    // A failed run counts toward execution statistics.
    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 1);
}

// ============================================================
// Disabled / missing workflows
// ============================================================

#[tokio::test]
async fn disabled_workflow_is_rejected_without_a_record() {
    let h = harness(HandlerRegistry::new());
    let mut definition = manual_definition("off", vec![]);
    definition.enabled = false;
    let wf = h.registry.create(definition).await.unwrap();

    let result = h.engine.trigger(wf.id, json!({})).await;
    assert!(matches!(result, Err(EngineError::WorkflowDisabled)));

    assert!(h.ledger.recent(wf.id, 10).await.is_empty());
    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 0);
}

#[tokio::test]
async fn missing_workflow_is_rejected() {
    let h = harness(HandlerRegistry::new());
    assert!(matches!(
        h.engine.trigger(Uuid::new_v4(), json!({})).await,
        Err(EngineError::WorkflowNotFound)
    ));
}

// ============================================================
// Template context: payload and prior step outputs
// ============================================================

#[tokio::test]
async fn action_parameters_are_interpolated_against_payload_and_steps() {
    let first = Arc::new(MockHandler::returning("first", json!({"ticket": 311})));
    let second = Arc::new(MockHandler::returning("second", json!({"ok": true})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", first.clone());
    handlers.register("sms", second.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition(
            "templated",
            vec![
                Action {
                    kind: ActionKind::Notification {
                        title: "new ticket".into(),
                        message: "from {{user.email}}".into(),
                        recipient: None,
                    },
                    stop_on_error: false,
                },
                Action {
                    kind: ActionKind::Sms {
                        to: "{{user.phone}}".into(),
                        message: "ticket {{steps.0.ticket}} filed".into(),
                    },
                    stop_on_error: false,
                },
            ],
        ))
        .await
        .unwrap();

    let payload = json!({"user": {"email": "a@b.com", "phone": "+4915112345678"}});
    let execution = h.engine.trigger(wf.id, payload).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    // Handlers observed fully-resolved parameters.
    assert_eq!(first.call(0)["message"], "from a@b.com");
    assert_eq!(second.call(0)["to"], "+4915112345678");
    assert_eq!(second.call(0)["message"], "ticket 311 filed");
}

// ============================================================
// Timeouts
// ============================================================

#[tokio::test]
async fn slow_action_records_a_timeout_failure() {
    let slow = Arc::new(MockHandler::delayed(
        "slow",
        Duration::from_secs(5),
        json!({}),
    ));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", slow);

    let config = ExecutorConfig {
        action_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let h = harness_with(handlers, config);
    let wf = h
        .registry
        .create(manual_definition("slow", vec![notification("hi", true)]))
        .await
        .unwrap();

    let execution = h.engine.trigger(wf.id, json!({})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.steps.len(), 1);
    // Timeout is a distinct failure kind, not a generic handler error.
    assert!(execution.steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("timed out"));
}

// ============================================================
// Cancellation
// ============================================================

#[tokio::test]
async fn cancellation_stops_the_run_at_the_next_action_boundary() {
    let slow = Arc::new(MockHandler::delayed(
        "slow",
        Duration::from_millis(200),
        json!({}),
    ));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", slow.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition(
            "cancellable",
            vec![notification("one", false), notification("two", false)],
        ))
        .await
        .unwrap();

    let engine = h.engine.clone();
    let id = wf.id;
    let run = tokio::spawn(async move { engine.trigger(id, json!({})).await });

    // Let the first action start, then cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.cancel_workflow(wf.id).await, 1);

    let execution = run.await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.steps.len(), 1);
    assert!(execution.error.as_deref().unwrap().contains("cancelled"));
    assert_eq!(slow.call_count(), 1);
}

// ============================================================
// Webhook triggering
// ============================================================

#[tokio::test]
async fn webhook_enforces_method_and_secret_then_runs() {
    let mock = Arc::new(MockHandler::returning("n", json!({})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock);

    let h = harness(handlers);
    let wf = h
        .registry
        .create(WorkflowDefinition {
            name: "hooked".into(),
            description: None,
            trigger: Trigger::Webhook {
                method: "POST".into(),
                headers: HashMap::new(),
                secret: Some("s3cret".into()),
            },
            conditions: vec![],
            actions: vec![notification("hi", false)],
            enabled: true,
        })
        .await
        .unwrap();

    let binding = h.registry.webhook_binding(wf.id).await.unwrap();

    assert!(matches!(
        h.engine
            .trigger_webhook(binding.id, "GET", Some("s3cret"), json!({}))
            .await,
        Err(EngineError::MethodNotAllowed { .. })
    ));
    assert!(matches!(
        h.engine
            .trigger_webhook(binding.id, "POST", Some("wrong"), json!({}))
            .await,
        Err(EngineError::InvalidSecret)
    ));
    assert!(matches!(
        h.engine
            .trigger_webhook(binding.id, "POST", None, json!({}))
            .await,
        Err(EngineError::InvalidSecret)
    ));

    let execution = h
        .engine
        .trigger_webhook(binding.id, "post", Some("s3cret"), json!({"ok": 1}))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn deleted_workflow_leaves_no_live_trigger() {
    let h = harness(HandlerRegistry::new());
    let wf = h
        .registry
        .create(WorkflowDefinition {
            name: "gone".into(),
            description: None,
            trigger: Trigger::Webhook {
                method: "POST".into(),
                headers: HashMap::new(),
                secret: None,
            },
            conditions: vec![],
            actions: vec![],
            enabled: true,
        })
        .await
        .unwrap();
    let binding = h.registry.webhook_binding(wf.id).await.unwrap();

    h.registry.delete(wf.id).await.unwrap();

    assert!(matches!(
        h.engine
            .trigger_webhook(binding.id, "POST", None, json!({}))
            .await,
        Err(EngineError::TriggerNotFound)
    ));
}

// ============================================================
// Concurrency: per-workflow single-flight
// ============================================================

#[tokio::test]
async fn concurrent_triggers_of_one_workflow_serialize_and_both_count() {
    let slow = Arc::new(MockHandler::delayed(
        "slow",
        Duration::from_millis(100),
        json!({}),
    ));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", slow.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(manual_definition("racy", vec![notification("hi", false)]))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.engine.trigger(wf.id, json!({"n": 1})),
        h.engine.trigger(wf.id, json!({"n": 2})),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.status, ExecutionStatus::Completed);
    assert_eq!(b.status, ExecutionStatus::Completed);
    assert_ne!(a.id, b.id);

    // Serialized runs: the second starts only after the first finished.
    let (first, second) = if a.started_at <= b.started_at {
        (&a, &b)
    } else {
        (&b, &a)
    };
    assert!(second.started_at >= first.completed_at.unwrap());

    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 2);
    assert_eq!(h.ledger.recent(wf.id, 10).await.len(), 2);
}

// ============================================================
// Counter invariant
// ============================================================

#[tokio::test]
async fn execution_count_matches_completed_plus_failed() {
    let failing = Arc::new(MockHandler::failing("boom", "nope"));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", failing);

    let h = harness(handlers);
    let mut definition = manual_definition("counted", vec![notification("hi", true)]);
    definition.conditions = vec![Condition {
        field: "run".into(),
        operator: Operator::Equals,
        value: json!(true),
    }];
    let wf = h.registry.create(definition).await.unwrap();

    // Two failed runs, one skipped.
    h.engine.trigger(wf.id, json!({"run": true})).await.unwrap();
    h.engine.trigger(wf.id, json!({"run": true})).await.unwrap();
    h.engine.trigger(wf.id, json!({"run": false})).await.unwrap();

    let stored = h.workflows.get(wf.id).await.unwrap();
    assert_eq!(stored.execution_count, 2);

    let records = h.ledger.recent(wf.id, 10).await;
    let counted = records
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                ExecutionStatus::Completed | ExecutionStatus::Failed
            )
        })
        .count() as u64;
    assert_eq!(stored.execution_count, counted);
    assert_eq!(records.len(), 3);
}

// ============================================================
// Scheduler end-to-end with a manual clock
// ============================================================

#[tokio::test]
async fn due_schedule_fires_and_recomputes_next_run() {
    let mock = Arc::new(MockHandler::returning("n", json!({})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(WorkflowDefinition {
            name: "cron".into(),
            description: None,
            trigger: Trigger::Schedule {
                expression: "*/5 * * * *".into(),
                timezone: "UTC".into(),
            },
            conditions: vec![],
            actions: vec![notification("tick", false)],
            enabled: true,
        })
        .await
        .unwrap();

    let scheduler = Scheduler::new(
        h.engine.clone(),
        h.bindings.clone(),
        h.clock.clone(),
        Duration::from_secs(60),
    );

    // Nothing due yet.
    assert_eq!(scheduler.fire_due().await, 0);

    // Jump past the next fire time.
    h.clock.advance(chrono::Duration::minutes(6));
    assert_eq!(scheduler.fire_due().await, 1);
    assert_eq!(mock.call_count(), 1);

    // The scheduled payload carries the fire time.
    let records = h.ledger.recent(wf.id, 10).await;
    assert_eq!(records.len(), 1);
    assert!(records[0].trigger_payload.get("scheduled_at").is_some());

    // next_run_at moved strictly past the clock.
    let schedules = h.bindings.schedules().await;
    assert!(schedules[0].next_run_at > h.clock.now());

    // Firing again immediately does nothing.
    assert_eq!(scheduler.fire_due().await, 0);

    // Advancing fires again — the schedule keeps recomputing.
    h.clock.advance(chrono::Duration::minutes(5));
    assert_eq!(scheduler.fire_due().await, 1);
    assert_eq!(mock.call_count(), 2);
}

// ============================================================
// Data-change matching feeding the engine
// ============================================================

#[tokio::test]
async fn data_change_match_then_trigger() {
    use actions::DataOperation;

    let mock = Arc::new(MockHandler::returning("n", json!({})));
    let mut handlers = HandlerRegistry::new();
    handlers.register("notification", mock.clone());

    let h = harness(handlers);
    let wf = h
        .registry
        .create(WorkflowDefinition {
            name: "cdc".into(),
            description: None,
            trigger: Trigger::DataChange {
                table: "orders".into(),
                operation: DataOperation::Insert,
                conditions: vec![],
            },
            conditions: vec![],
            actions: vec![notification("new order", false)],
            enabled: true,
        })
        .await
        .unwrap();

    // An external CDC collaborator observes a mutation and asks the binder.
    let record = json!({"id": 9, "total": 120});
    let matched = h
        .binder
        .match_data_change("orders", DataOperation::Insert, &record)
        .await;
    assert_eq!(matched, vec![wf.id]);

    for workflow_id in matched {
        h.engine.trigger(workflow_id, record.clone()).await.unwrap();
    }
    assert_eq!(mock.call_count(), 1);
    assert_eq!(h.workflows.get(wf.id).await.unwrap().execution_count, 1);
}
