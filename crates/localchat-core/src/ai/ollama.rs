use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{ChatMessage, ChatRole};

/// Address the local Ollama server listens on out of the box.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Ollama server not reachable at {url}: {source}")]
    ServerNotRunning {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ollama API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Roles understood by the Ollama chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundRole {
    System,
    User,
    Assistant,
}

impl From<ChatRole> for OutboundRole {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::User => OutboundRole::User,
            ChatRole::Assistant => OutboundRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub role: OutboundRole,
    pub content: String,
}

impl OutboundMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: OutboundRole::System,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for OutboundMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.into(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [OutboundMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaReplyMessage,
}

#[derive(Deserialize)]
struct OllamaReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a full message list and wait for the single, non-streamed reply.
    pub async fn chat(&self, model: &str, messages: &[OutboundMessage]) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        tracing::debug!(model, count = messages.len(), "sending chat request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response.json().await?;
        Ok(chat_response.message.content)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api { status, body });
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }

    fn connect_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                url: self.base_url.clone(),
                source: e,
            }
        } else {
            OllamaError::Http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unreachable_url, StubOllama};

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://127.0.0.1:11434/");
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_outbound_roles_lowercase() {
        let json = serde_json::to_value(OutboundMessage::system("rules")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[tokio::test]
    async fn test_chat_returns_reply_content() {
        let stub = StubOllama::replying("Hi").start().await;
        let client = OllamaClient::new(&stub.url());

        let reply = client
            .chat("llama3.2", &[OutboundMessage::system("be brief")])
            .await
            .unwrap();

        assert_eq!(reply, "Hi");
        let seen = stub.chat_requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["model"], "llama3.2");
        assert_eq!(seen[0]["stream"], false);
    }

    #[tokio::test]
    async fn test_list_models_keeps_names_only() {
        let stub = StubOllama::with_models(&["a", "b"]).start().await;
        let client = OllamaClient::new(&stub.url());

        assert_eq!(client.list_models().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let stub = StubOllama::failing().start().await;
        let client = OllamaClient::new(&stub.url());

        let err = client.chat("missing", &[]).await.unwrap_err();
        assert!(matches!(err, OllamaError::Api { .. }));
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = OllamaClient::new(&unreachable_url());

        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, OllamaError::ServerNotRunning { .. }));
    }
}
