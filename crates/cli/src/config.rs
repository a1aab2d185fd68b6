//! Server configuration.

use std::time::Duration;

use actions::DeliveryConfig;
use engine::ExecutorConfig;

/// Runtime configuration, loaded from environment variables with sensible
/// defaults for local use.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind: String,

    /// Per-action dispatch deadline.
    pub action_timeout: Duration,

    /// Whole-run deadline.
    pub run_timeout: Duration,

    /// Upper bound on the scheduler's sleep between checks.
    pub scheduler_poll_interval: Duration,

    /// Optional HTTP gateway endpoints for the delivery action channels.
    pub email_gateway: Option<String>,
    pub sms_gateway: Option<String>,
    pub notification_gateway: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let bind = std::env::var("FLOWRUNNER_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let action_timeout_secs: u64 = std::env::var("FLOWRUNNER_ACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let run_timeout_secs: u64 = std::env::var("FLOWRUNNER_RUN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let poll_secs: u64 = std::env::var("FLOWRUNNER_SCHEDULER_POLL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            bind,
            action_timeout: Duration::from_secs(action_timeout_secs),
            run_timeout: Duration::from_secs(run_timeout_secs),
            scheduler_poll_interval: Duration::from_secs(poll_secs),
            email_gateway: std::env::var("FLOWRUNNER_EMAIL_GATEWAY").ok(),
            sms_gateway: std::env::var("FLOWRUNNER_SMS_GATEWAY").ok(),
            notification_gateway: std::env::var("FLOWRUNNER_NOTIFICATION_GATEWAY").ok(),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            action_timeout: self.action_timeout,
            run_timeout: self.run_timeout,
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            email_gateway: self.email_gateway.clone(),
            sms_gateway: self.sms_gateway.clone(),
            notification_gateway: self.notification_gateway.clone(),
        }
    }
}
