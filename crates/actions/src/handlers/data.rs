//! `database` action handler — mutates the injectable data store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use store::DataStore;

use crate::handlers::http::mismatch;
use crate::{ActionContext, ActionError, ActionHandler, ActionKind, DataOperation};

pub struct DatabaseHandler {
    data: Arc<DataStore>,
}

impl DatabaseHandler {
    pub fn new(data: Arc<DataStore>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ActionHandler for DatabaseHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        _ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let ActionKind::Database { table, operation, record, filter } = action else {
            return Err(mismatch(action));
        };

        let affected = match operation {
            DataOperation::Insert => {
                if !record.is_object() {
                    return Err(ActionError::Failed(
                        "database insert requires an object record".into(),
                    ));
                }
                self.data.insert(table, record.clone()).await;
                1
            }
            DataOperation::Update => self.data.update(table, filter, record).await,
            DataOperation::Delete => self.data.delete(table, filter).await,
        };

        debug!(%table, op = %operation, affected, "database action applied");
        Ok(json!({ "table": table, "operation": operation.to_string(), "affected": affected }))
    }
}
