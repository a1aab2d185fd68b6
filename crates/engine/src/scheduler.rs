//! Schedule parsing and the scheduler loop.
//!
//! Schedules are real cron expressions evaluated in the binding's timezone.
//! `next_run_at` is recomputed from the actual fire time after every fire,
//! so the schedule never drifts and interval approximation never creeps in.
//! The clock is injectable for deterministic tests.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{info, warn};

use store::BindingStore;

use crate::executor::ExecutionEngine;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source for schedule computation.  Production uses [`SystemClock`];
/// tests inject a manual one.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed, manually-advanced time source for deterministic tests.
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

/// Parse a cron expression.  Five-field expressions (minute-granularity,
/// the common crontab form) are accepted by pinning the seconds field to 0.
pub fn parse_schedule(expression: &str) -> Result<Schedule, EngineError> {
    let normalized = normalize_expression(expression);
    Schedule::from_str(&normalized).map_err(|e| {
        EngineError::Configuration(format!("invalid schedule expression '{expression}': {e}"))
    })
}

/// Resolve an IANA timezone name.
pub fn parse_timezone(timezone: &str) -> Result<Tz, EngineError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| EngineError::Configuration(format!("unknown timezone '{timezone}'")))
}

fn normalize_expression(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {}", expression.trim())
    } else {
        expression.trim().to_string()
    }
}

/// The next fire time strictly after `after`, evaluated in `timezone` and
/// returned in UTC.
pub fn compute_next_run(
    expression: &str,
    timezone: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, EngineError> {
    let schedule = parse_schedule(expression)?;
    let tz = parse_timezone(timezone)?;
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|next| next.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::Configuration(format!(
                "schedule '{expression}' has no future fire times"
            ))
        })
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives schedule bindings: fires due entries and recomputes their next
/// run time.
pub struct Scheduler {
    engine: Arc<ExecutionEngine>,
    bindings: Arc<dyn BindingStore>,
    clock: Arc<dyn Clock>,
    /// Upper bound on how long the loop sleeps between checks, so newly
    /// bound schedules are picked up promptly.
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        engine: Arc<ExecutionEngine>,
        bindings: Arc<dyn BindingStore>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            bindings,
            clock,
            poll_interval,
        }
    }

    /// Fire every due, enabled binding once.  The next run time is persisted
    /// *before* the workflow is triggered, so an overlapping tick cannot
    /// double-fire the same binding.  Returns the number of bindings fired.
    pub async fn fire_due(&self) -> usize {
        let now = self.clock.now();
        let mut runs = JoinSet::new();
        let mut fired = 0;

        for binding in self.bindings.schedules().await {
            if !binding.enabled || binding.next_run_at > now {
                continue;
            }

            match compute_next_run(&binding.expression, &binding.timezone, now) {
                Ok(next) => {
                    if let Err(e) = self.bindings.set_next_run(binding.id, next).await {
                        warn!(binding_id = %binding.id, error = %e, "cannot persist next run time");
                        continue;
                    }
                }
                Err(e) => {
                    warn!(binding_id = %binding.id, error = %e, "cannot recompute schedule");
                    continue;
                }
            }

            fired += 1;
            let engine = self.engine.clone();
            let workflow_id = binding.workflow_id;
            let payload = json!({ "scheduled_at": now.to_rfc3339() });
            runs.spawn(async move {
                match engine.trigger(workflow_id, payload).await {
                    Ok(execution) => {
                        info!(%workflow_id, execution_id = %execution.id, status = %execution.status, "scheduled run finished")
                    }
                    Err(e) => warn!(%workflow_id, error = %e, "scheduled run rejected"),
                }
            });
        }

        while runs.join_next().await.is_some() {}
        fired
    }

    /// Run the scheduler until the task is aborted.  Sleeps until the
    /// earliest `next_run_at`, capped at `poll_interval`.
    pub async fn run(self: Arc<Self>) {
        loop {
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.fire_due().await;
            });

            let sleep_for = self.time_until_next_due().await;
            tokio::time::sleep(sleep_for).await;
        }
    }

    async fn time_until_next_due(&self) -> Duration {
        let now = self.clock.now();
        let earliest = self
            .bindings
            .schedules()
            .await
            .into_iter()
            .filter(|b| b.enabled)
            .map(|b| b.next_run_at)
            .min();

        match earliest {
            Some(at) if at <= now => Duration::from_millis(50),
            Some(at) => ((at - now).to_std().unwrap_or(self.poll_interval)).min(self.poll_interval),
            None => self.poll_interval,
        }
    }
}
