//! `store` crate — pure persistence layer.
//!
//! Provides storage traits, typed record structs, and in-memory
//! implementations for every aggregate the engine owns: workflow
//! definitions, trigger bindings, the execution ledger, and the data
//! tables mutated by `database` actions.  No business logic lives here.
//!
//! The traits are the seam for a database-backed implementation; the
//! in-memory stores are what tests and the default `serve` setup use.

pub mod error;
pub mod models;
pub mod workflows;
pub mod bindings;
pub mod executions;
pub mod data;

pub use error::StoreError;
pub use models::{
    DataChangeBinding, ExecutionRecord, ExecutionStatus, ScheduleBinding, StepRecord,
    WebhookBinding, WorkflowRecord,
};
pub use workflows::{MemoryWorkflowStore, WorkflowStore};
pub use bindings::{BindingStore, MemoryBindingStore};
pub use executions::{ExecutionLedger, MemoryExecutionLedger};
pub use data::DataStore;
