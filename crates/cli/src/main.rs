//! `flowrunner` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server, scheduler included.
//! - `validate` — validate a workflow definition JSON file.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use actions::HandlerRegistry;
use api::AppState;
use engine::{
    validate_definition_file, ExecutionEngine, Scheduler, SystemClock, TriggerBinder,
    WorkflowRegistry,
};
use store::{DataStore, MemoryBindingStore, MemoryExecutionLedger, MemoryWorkflowStore};

use config::ServerConfig;

#[derive(Parser)]
#[command(
    name = "flowrunner",
    about = "Workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server with the scheduler running.
    Serve {
        #[arg(long, env = "FLOWRUNNER_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow definition JSON file.
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let mut config = ServerConfig::from_env();
            config.bind = bind;
            serve(config).await
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read file {}", path.display()))?;

            match validate_definition_file(&content) {
                Ok(definition) => {
                    println!(
                        "workflow '{}' is valid ({} conditions, {} actions)",
                        definition.name,
                        definition.conditions.len(),
                        definition.actions.len()
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("starting flowrunner on {}", config.bind);

    let workflows = Arc::new(MemoryWorkflowStore::new());
    let bindings = Arc::new(MemoryBindingStore::new());
    let ledger = Arc::new(MemoryExecutionLedger::new());
    let data = Arc::new(DataStore::new());
    let clock = Arc::new(SystemClock);

    let binder = Arc::new(TriggerBinder::new(bindings.clone(), clock.clone()));
    let registry = Arc::new(WorkflowRegistry::new(workflows.clone(), binder));
    let handlers = Arc::new(HandlerRegistry::builtin(data, config.delivery_config()));
    let engine = Arc::new(ExecutionEngine::new(
        workflows,
        bindings.clone(),
        ledger.clone(),
        handlers,
        config.executor_config(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        engine.clone(),
        bindings,
        clock,
        config.scheduler_poll_interval,
    ));
    tokio::spawn(scheduler.run());

    let state = AppState {
        registry,
        engine,
        ledger,
    };
    api::serve(&config.bind, state).await
}
