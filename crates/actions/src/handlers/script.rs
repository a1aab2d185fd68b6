//! `script` action handler — evaluates a rhai script.
//!
//! The trigger payload and the merged template context are bound into the
//! scope as `payload` and `context`; the script's return value becomes the
//! step output.  Scripts run with a bounded operation budget so a runaway
//! loop cannot pin an executor thread.

use async_trait::async_trait;
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use crate::handlers::http::mismatch;
use crate::{ActionContext, ActionError, ActionHandler, ActionKind};

const MAX_SCRIPT_OPERATIONS: u64 = 100_000;

#[derive(Default)]
pub struct ScriptHandler;

impl ScriptHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for ScriptHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let ActionKind::Script { source } = action else {
            return Err(mismatch(action));
        };

        let mut engine = Engine::new();
        engine.set_max_operations(MAX_SCRIPT_OPERATIONS);

        let payload = rhai::serde::to_dynamic(&ctx.payload)
            .map_err(|e| ActionError::Failed(format!("cannot bind payload: {e}")))?;
        let context = rhai::serde::to_dynamic(&ctx.context)
            .map_err(|e| ActionError::Failed(format!("cannot bind context: {e}")))?;

        let mut scope = Scope::new();
        scope.push("payload", payload);
        scope.push("context", context);

        let result = engine
            .eval_with_scope::<Dynamic>(&mut scope, source)
            .map_err(|e| ActionError::Failed(format!("script error: {e}")))?;

        rhai::serde::from_dynamic::<Value>(&result)
            .map_err(|e| ActionError::Failed(format!("script returned unsupported value: {e}")))
    }
}
