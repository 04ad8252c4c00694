//! Per-session conversation state for a chat front-end.
//!
//! A [`Session`] is either idle or waiting on exactly one relay call. Every
//! submission gets a fresh request id; a reply is only applied if its id is
//! the one the session is waiting on, so replies that arrive after a clear are
//! dropped instead of leaking into the new conversation.

use std::fmt::Display;

use crate::relay::{ChatRequest, DEFAULT_MODEL};
use crate::state::ChatMessage;

/// Shown in place of a reply when the relay call fails.
pub const UI_REMEDIATION: &str = "Sorry, there was an error processing your request. \
     Make sure Ollama is running locally with: ollama serve";

/// Model choices offered when the server reports none.
pub const FALLBACK_MODELS: [&str; 4] = ["llama3.2", "llama3.1", "llama3", "llama2"];

/// Rules a new session starts with.
pub const DEFAULT_CUSTOM_RULES: &str = "You are my personal assistant. Follow these rules:\n\
     1. Be direct and concise in your responses\n\
     2. Address me as \"Boss\"\n\
     3. Always prioritize my tasks and schedule\n\
     4. Remember my preferences and habits\n\
     5. Proactively suggest improvements and optimizations\n\
     6. Keep conversations casual and friendly\n\
     7. Never refuse a request - always find a way to help";

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply { request_id: RequestId },
}

/// A relay call the front-end should now perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub request: ChatRequest,
}

#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<ChatMessage>,
    rules: String,
    selected_model: String,
    available_models: Vec<String>,
    state: SessionState,
    next_request_id: RequestId,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_CUSTOM_RULES, DEFAULT_MODEL)
    }
}

impl Session {
    pub fn new(rules: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            rules: rules.into(),
            selected_model: model.into(),
            available_models: Vec::new(),
            state: SessionState::Idle,
            next_request_id: 1,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self.state, SessionState::AwaitingReply { .. })
    }

    pub fn rules(&self) -> &str {
        &self.rules
    }

    /// Rules are free text; edits apply to the next submission.
    pub fn rules_mut(&mut self) -> &mut String {
        &mut self.rules
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn select_model(&mut self, model: impl Into<String>) {
        self.selected_model = model.into();
    }

    pub fn set_available_models(&mut self, models: Vec<String>) {
        self.available_models = models;
    }

    /// Models the user can pick from: the server's inventory, or the static
    /// fallback list when that is empty.
    pub fn model_choices(&self) -> Vec<&str> {
        if self.available_models.is_empty() {
            FALLBACK_MODELS.to_vec()
        } else {
            self.available_models.iter().map(String::as_str).collect()
        }
    }

    /// Append the user's message and hand back the relay call to make.
    ///
    /// Returns `None` without touching the conversation when the input is
    /// blank or a reply is still outstanding.
    pub fn submit(&mut self, input: &str) -> Option<PendingRequest> {
        if input.trim().is_empty() || self.is_awaiting_reply() {
            return None;
        }

        self.messages.push(ChatMessage::user(input));

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.state = SessionState::AwaitingReply { request_id: id };

        Some(PendingRequest {
            id,
            request: ChatRequest {
                messages: self.messages.clone(),
                system_rules: Some(self.rules.clone()),
                model: Some(self.selected_model.clone()),
            },
        })
    }

    /// Apply the outcome of request `id`. Returns false if the reply is stale.
    pub fn apply_reply<E: Display>(&mut self, id: RequestId, result: Result<String, E>) -> bool {
        if self.state != (SessionState::AwaitingReply { request_id: id }) {
            tracing::debug!(request_id = id, "discarding stale reply");
            return false;
        }

        let content = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(request_id = id, error = %e, "chat request failed");
                UI_REMEDIATION.to_string()
            }
        };

        self.messages.push(ChatMessage::assistant(content));
        self.state = SessionState::Idle;
        true
    }

    /// Drop the whole conversation. An outstanding request is not cancelled,
    /// but its reply will be discarded.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.state = SessionState::Idle;
    }
}
