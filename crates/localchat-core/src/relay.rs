//! Stateless forwarding between a chat front-end and the local Ollama server.
//!
//! A relay call takes the whole conversation, prepends one system message
//! holding the rules, and makes a single non-streaming call upstream. Nothing
//! is retried and nothing is remembered between calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{OllamaClient, OllamaError, OutboundMessage};
use crate::state::ChatMessage;

/// System prompt used when a request carries no rules.
pub const DEFAULT_SYSTEM_RULES: &str = "You are a helpful assistant.";

/// Model used when a request names none.
pub const DEFAULT_MODEL: &str = "llama3.2";

pub const UPSTREAM_SUGGESTION: &str = "Make sure Ollama is running with: ollama serve";

const INVALID_REQUEST_SUGGESTION: &str =
    r#"Send a JSON body like {"messages": [{"role": "user", "content": "Hello"}], "systemRules": "...", "model": "llama3.2"}"#;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
    #[error("Failed to get response from Ollama: {0}")]
    Chat(#[source] OllamaError),
    #[error("Failed to fetch models from Ollama: {0}")]
    ListModels(#[source] OllamaError),
}

impl RelayError {
    /// Short, stable description of what went wrong.
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => "Invalid request",
            RelayError::Chat(_) => "Failed to get response from Ollama",
            RelayError::ListModels(_) => "Failed to fetch models from Ollama",
        }
    }

    /// The underlying error, without the category prefix.
    pub fn details(&self) -> String {
        match self {
            RelayError::InvalidRequest(e) => e.to_string(),
            RelayError::Chat(e) | RelayError::ListModels(e) => e.to_string(),
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => INVALID_REQUEST_SUGGESTION,
            RelayError::Chat(_) | RelayError::ListModels(_) => UPSTREAM_SUGGESTION,
        }
    }

    pub fn is_upstream(&self) -> bool {
        !matches!(self, RelayError::InvalidRequest(_))
    }
}

/// Body of a chat relay call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_rules: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    /// Parse and validate a raw JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self, RelayError> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Build the message list sent upstream: the rules as a single system
/// message, then the conversation untouched and in order.
pub fn outbound_messages(messages: &[ChatMessage], system_rules: Option<&str>) -> Vec<OutboundMessage> {
    let rules = non_empty(system_rules).unwrap_or(DEFAULT_SYSTEM_RULES);

    let mut outbound = Vec::with_capacity(messages.len() + 1);
    outbound.push(OutboundMessage::system(rules));
    outbound.extend(messages.iter().map(OutboundMessage::from));
    outbound
}

#[derive(Clone)]
pub struct Relay {
    ollama: OllamaClient,
    default_model: String,
}

impl Relay {
    pub fn new(ollama: OllamaClient) -> Self {
        Self {
            ollama,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama.base_url()
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<String, RelayError> {
        let model = non_empty(request.model.as_deref()).unwrap_or(self.default_model.as_str());
        let outbound = outbound_messages(&request.messages, request.system_rules.as_deref());

        match self.ollama.chat(model, &outbound).await {
            Ok(reply) => {
                tracing::info!(model, messages = request.messages.len(), "relayed chat reply");
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(model, error = %e, "error calling Ollama");
                Err(RelayError::Chat(e))
            }
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, RelayError> {
        self.ollama.list_models().await.map_err(|e| {
            tracing::error!(error = %e, "error fetching models");
            RelayError::ListModels(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::OutboundRole;
    use crate::testing::{unreachable_url, StubOllama};

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
            ChatMessage::user("third"),
        ]
    }

    #[test]
    fn test_outbound_prepends_rules() {
        let outbound = outbound_messages(&conversation(), Some("Call me Boss"));

        assert_eq!(outbound.len(), 4);
        assert_eq!(outbound[0], OutboundMessage::system("Call me Boss"));
        let contents: Vec<&str> = outbound[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(outbound[2].role, OutboundRole::Assistant);
    }

    #[test]
    fn test_outbound_default_rules() {
        for rules in [None, Some("")] {
            let outbound = outbound_messages(&[], rules);
            assert_eq!(outbound, vec![OutboundMessage::system(DEFAULT_SYSTEM_RULES)]);
        }
    }

    #[test]
    fn test_whitespace_rules_kept_verbatim() {
        let outbound = outbound_messages(&[], Some("  "));
        assert_eq!(outbound[0].content, "  ");
    }

    #[test]
    fn test_request_optional_fields() {
        let request = ChatRequest::from_json(br#"{"messages": [], "systemRules": null}"#).unwrap();
        assert_eq!(request, ChatRequest::default());
    }

    #[test]
    fn test_request_validation() {
        let bad_bodies: [&[u8]; 4] = [
            b"not json",
            br#"{"systemRules": "x"}"#,
            br#"{"messages": [{"role": "system", "content": "x"}]}"#,
            br#"{"messages": [{"role": "user"}]}"#,
        ];
        for body in bad_bodies {
            let err = ChatRequest::from_json(body).unwrap_err();
            assert!(!err.is_upstream());
            assert_eq!(err.category(), "Invalid request");
        }
    }

    #[tokio::test]
    async fn test_chat_uses_defaults() {
        let stub = StubOllama::replying("Hi").start().await;
        let relay = Relay::new(OllamaClient::new(&stub.url()));

        let request = ChatRequest {
            messages: vec![ChatMessage::user("Hello")],
            system_rules: None,
            model: Some(String::new()),
        };
        assert_eq!(relay.chat(&request).await.unwrap(), "Hi");

        let sent = stub.chat_requests().remove(0);
        assert_eq!(sent["model"], DEFAULT_MODEL);
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][0]["content"], DEFAULT_SYSTEM_RULES);
        assert_eq!(sent["messages"][1]["content"], "Hello");
    }

    #[tokio::test]
    async fn test_configured_default_model() {
        let stub = StubOllama::replying("ok").start().await;
        let relay = Relay::new(OllamaClient::new(&stub.url())).with_default_model("mistral");

        relay.chat(&ChatRequest::default()).await.unwrap();
        assert_eq!(stub.chat_requests()[0]["model"], "mistral");
    }

    #[tokio::test]
    async fn test_unreachable_has_suggestion() {
        let relay = Relay::new(OllamaClient::new(&unreachable_url()));

        let err = relay.chat(&ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, RelayError::Chat(OllamaError::ServerNotRunning { .. })));
        assert!(err.is_upstream());
        assert_eq!(err.category(), "Failed to get response from Ollama");
        assert!(!err.details().is_empty());
        assert!(!err.suggestion().is_empty());

        let err = relay.list_models().await.unwrap_err();
        assert!(matches!(err, RelayError::ListModels(OllamaError::ServerNotRunning { .. })));
        assert!(err.is_upstream());
        assert_eq!(err.category(), "Failed to fetch models from Ollama");
    }
}
