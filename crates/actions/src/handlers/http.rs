//! Outbound HTTP handlers: `http_request` and `webhook`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::{ActionContext, ActionError, ActionHandler, ActionKind};

/// Response bodies are truncated to this length before being recorded on
/// the step output.
const MAX_BODY_LEN: usize = 4096;

pub struct HttpRequestHandler {
    client: Client,
}

impl HttpRequestHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionHandler for HttpRequestHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        _ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let ActionKind::HttpRequest { url, method, headers, body } = action else {
            return Err(mismatch(action));
        };

        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| ActionError::Failed(format!("invalid HTTP method '{method}'")))?;

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;

        let status = response.status().as_u16();
        let mut text = response
            .text()
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;
        text.truncate(MAX_BODY_LEN);

        debug!(%url, status, "http_request completed");
        Ok(json!({ "status": status, "body": text }))
    }
}

/// Forwards the trigger payload (or an explicit payload) to another endpoint.
pub struct WebhookHandler {
    client: Client,
}

impl WebhookHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionHandler for WebhookHandler {
    async fn execute(
        &self,
        action: &ActionKind,
        ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        let ActionKind::Webhook { url, payload } = action else {
            return Err(mismatch(action));
        };

        let body = payload.clone().unwrap_or_else(|| ctx.payload.clone());
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;

        let status = response.status().as_u16();
        debug!(%url, status, "webhook forwarded");
        Ok(json!({ "status": status }))
    }
}

pub(crate) fn mismatch(action: &ActionKind) -> ActionError {
    ActionError::Failed(format!(
        "handler received mismatched action type '{}'",
        action.tag()
    ))
}
