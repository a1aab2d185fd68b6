//! Handler registry — maps action-type tags to handler implementations.

use std::collections::HashMap;
use std::sync::Arc;

use store::DataStore;

use crate::handlers::{
    data::DatabaseHandler,
    delivery::{DeliveryConfig, DeliveryHandler},
    http::{HttpRequestHandler, WebhookHandler},
    messaging::ChatMessageHandler,
    script::ScriptHandler,
};
use crate::ActionHandler;

/// Registry of [`ActionHandler`] implementations keyed by action-type tag.
///
/// New action kinds are supported by registering a handler under their tag;
/// nothing else in the engine changes.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.  Tests register mocks into this.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in handler installed.
    pub fn builtin(data: Arc<DataStore>, delivery: DeliveryConfig) -> Self {
        let client = reqwest::Client::new();
        let chat = Arc::new(ChatMessageHandler::new(client.clone()));
        let deliver = Arc::new(DeliveryHandler::new(client.clone(), delivery));

        let mut registry = Self::new();
        registry.register("http_request", Arc::new(HttpRequestHandler::new(client.clone())));
        registry.register("webhook", Arc::new(WebhookHandler::new(client)));
        registry.register("slack", chat.clone());
        registry.register("discord", chat.clone());
        registry.register("teams", chat);
        registry.register("email", deliver.clone());
        registry.register("sms", deliver.clone());
        registry.register("notification", deliver);
        registry.register("database", Arc::new(DatabaseHandler::new(data)));
        registry.register("script", Arc::new(ScriptHandler::new()));
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(tag.into(), handler);
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(tag).cloned()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}
