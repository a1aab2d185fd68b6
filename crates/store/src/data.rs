//! Application data tables mutated by `database` actions.
//!
//! A deliberately small table/record model: each table is a list of JSON
//! objects, and filters are equality matches over top-level fields.  This is
//! also the store an external change-data-capture collaborator would watch
//! to feed `data_change` triggers.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory table store.
#[derive(Default)]
pub struct DataStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a table, creating the table on first use.
    pub async fn insert(&self, table: &str, record: Value) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record);
    }

    /// Merge `patch` into every record matching `filter`.
    /// Returns the number of records updated.
    pub async fn update(&self, table: &str, filter: &Value, patch: &Value) -> usize {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let mut updated = 0;
        for row in rows.iter_mut() {
            if matches_filter(row, filter) {
                merge_into(row, patch);
                updated += 1;
            }
        }
        updated
    }

    /// Delete every record matching `filter`.
    /// Returns the number of records removed.
    pub async fn delete(&self, table: &str, filter: &Value) -> usize {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|row| !matches_filter(row, filter));
        before - rows.len()
    }

    /// Snapshot of a table's records.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

/// Equality match on every top-level field of `filter`.
/// An empty or non-object filter matches everything.
fn matches_filter(row: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(fields) => fields.iter().all(|(k, v)| row.get(k) == Some(v)),
        None => true,
    }
}

fn merge_into(row: &mut Value, patch: &Value) {
    if let (Some(row_obj), Some(patch_obj)) = (row.as_object_mut(), patch.as_object()) {
        for (k, v) in patch_obj {
            row_obj.insert(k.clone(), v.clone());
        }
    }
}
