//! Delivery handlers: `email`, `sms`, `notification`.
//!
//! Each channel posts to a configured HTTP gateway endpoint.  With no
//! gateway configured the delivery is simulated: the message is logged and
//! the step output says so explicitly, which keeps local setups and tests
//! working without outbound credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::handlers::http::mismatch;
use crate::{ActionContext, ActionError, ActionHandler, ActionKind};

/// Gateway endpoints for the delivery channels.  `None` means simulate.
#[derive(Debug, Clone, Default)]
pub struct DeliveryConfig {
    pub email_gateway: Option<String>,
    pub sms_gateway: Option<String>,
    pub notification_gateway: Option<String>,
}

pub struct DeliveryHandler {
    client: Client,
    config: DeliveryConfig,
}

impl DeliveryHandler {
    pub fn new(client: Client, config: DeliveryConfig) -> Self {
        Self { client, config }
    }

    async fn deliver(
        &self,
        channel: &str,
        gateway: Option<&String>,
        message: Value,
    ) -> Result<Value, ActionError> {
        match gateway {
            Some(url) => {
                let response = self
                    .client
                    .post(url)
                    .json(&message)
                    .send()
                    .await
                    .map_err(|e| ActionError::Failed(e.to_string()))?;
                let status = response.status().as_u16();
                if !(200..300).contains(&status) {
                    return Err(ActionError::Failed(format!(
                        "{channel} gateway returned status {status}"
                    )));
                }
                Ok(json!({ "channel": channel, "delivery": "gateway", "status": status }))
            }
            None => {
                info!(channel, payload = %message, "no gateway configured, delivery simulated");
                let mut output = json!({ "channel": channel, "delivery": "simulated" });
                if let (Some(out), Some(msg)) = (output.as_object_mut(), message.as_object()) {
                    for (k, v) in msg {
                        out.insert(k.clone(), v.clone());
                    }
                }
                Ok(output)
            }
        }
    }
}

#[async_trait]
impl ActionHandler for DeliveryHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        _ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        match action {
            ActionKind::Email { to, subject, body } => {
                self.deliver(
                    "email",
                    self.config.email_gateway.as_ref(),
                    json!({ "to": to, "subject": subject, "body": body }),
                )
                .await
            }
            ActionKind::Sms { to, message } => {
                self.deliver(
                    "sms",
                    self.config.sms_gateway.as_ref(),
                    json!({ "to": to, "message": message }),
                )
                .await
            }
            ActionKind::Notification { title, message, recipient } => {
                self.deliver(
                    "notification",
                    self.config.notification_gateway.as_ref(),
                    json!({ "title": title, "message": message, "recipient": recipient }),
                )
                .await
            }
            other => Err(mismatch(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx() -> ActionContext {
        ActionContext {
            workflow_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            payload: json!({}),
            context: json!({}),
        }
    }

    #[tokio::test]
    async fn unconfigured_email_is_simulated() {
        let handler = DeliveryHandler::new(Client::new(), DeliveryConfig::default());
        let action = ActionKind::Email {
            to: "ops@example.com".into(),
            subject: "alert".into(),
            body: "disk full".into(),
        };

        let output = handler.execute(&action, &ctx()).await.unwrap();
        assert_eq!(output["delivery"], "simulated");
        assert_eq!(output["to"], "ops@example.com");
        assert_eq!(output["channel"], "email");
    }

    #[tokio::test]
    async fn mismatched_action_is_rejected() {
        let handler = DeliveryHandler::new(Client::new(), DeliveryConfig::default());
        let action = ActionKind::Script { source: "1".into() };
        assert!(matches!(
            handler.execute(&action, &ctx()).await,
            Err(ActionError::Failed(_))
        ));
    }
}
