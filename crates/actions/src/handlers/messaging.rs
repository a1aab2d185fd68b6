//! Chat-platform message handlers: `slack`, `discord`, `teams`.
//!
//! All three platforms accept an incoming-webhook JSON POST; only the body
//! shape differs, so one handler serves the three tags.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::handlers::http::mismatch;
use crate::{ActionContext, ActionError, ActionHandler, ActionKind};

pub struct ChatMessageHandler {
    client: Client,
}

impl ChatMessageHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionHandler for ChatMessageHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        _ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let (platform, url, body) = match action {
            ActionKind::Slack { webhook_url, message, channel } => {
                let mut body = json!({ "text": message });
                if let Some(channel) = channel {
                    body["channel"] = Value::String(channel.clone());
                }
                ("slack", webhook_url, body)
            }
            ActionKind::Discord { webhook_url, message } => {
                ("discord", webhook_url, json!({ "content": message }))
            }
            ActionKind::Teams { webhook_url, message } => {
                ("teams", webhook_url, json!({ "text": message }))
            }
            other => return Err(mismatch(other)),
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ActionError::Failed(format!(
                "{platform} webhook returned status {status}"
            )));
        }

        debug!(platform, status, "chat message delivered");
        Ok(json!({ "platform": platform, "status": status }))
    }
}
