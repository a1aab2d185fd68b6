//! `MockHandler` — a test double for `ActionHandler`.
//!
//! Useful in unit and integration tests where a real handler is either
//! unavailable or irrelevant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ActionContext, ActionError, ActionHandler, ActionKind};

/// Behaviour injected into `MockHandler` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with an `ActionError::Failed`.
    Fail(String),
    /// Sleep, then return the value.  Used for deadline tests.
    Delay(Duration, Value),
}

/// A mock handler that records every action it receives (after the engine's
/// interpolation pass, so tests can assert on resolved parameters) and
/// returns a programmer-specified result.
pub struct MockHandler {
    /// Label used in test assertions.
    pub name: String,
    /// What the handler will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All actions seen by this handler (in call order), serialised.
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockHandler {
    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnValue(value),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Fail(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that sleeps before succeeding.
    pub fn delayed(name: impl Into<String>, delay: Duration, value: Value) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Delay(delay, value),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this handler has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The n-th recorded action, serialised.
    pub fn call(&self, n: usize) -> Value {
        self.calls.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl ActionHandler for MockHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        _ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let recorded = serde_json::to_value(action).unwrap_or(Value::Null);
        self.calls.lock().unwrap().push(recorded);

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(v.clone()),
            MockBehaviour::Fail(msg) => Err(ActionError::Failed(msg.clone())),
            MockBehaviour::Delay(delay, v) => {
                tokio::time::sleep(*delay).await;
                Ok(v.clone())
            }
        }
    }
}
