//! In-process stand-in for a local Ollama server.
//!
//! Binds an axum app on an ephemeral loopback port and records every chat
//! request body it receives, so tests can assert on what the relay sent.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct StubOllama {
    reply: String,
    models: Vec<String>,
    failing: bool,
}

struct StubState {
    config: StubOllama,
    chat_requests: Mutex<Vec<Value>>,
}

pub struct RunningStub {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubOllama {
    /// Answers every chat request with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    /// Reports `models` as the installed inventory.
    pub fn with_models(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Answers every request with a 404 `{"error": "model not found"}`.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn start(self) -> RunningStub {
        let state = Arc::new(StubState {
            config: self,
            chat_requests: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/api/chat", post(chat))
            .route("/api/tags", get(tags))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        RunningStub { addr, state, task }
    }
}

impl RunningStub {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received on `/api/chat`, oldest first.
    pub fn chat_requests(&self) -> Vec<Value> {
        self.state.chat_requests.lock().expect("stub lock").clone()
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "model not found" }))).into_response()
}

async fn chat(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    let model = body["model"].clone();
    state.chat_requests.lock().expect("stub lock").push(body);

    if state.config.failing {
        return not_found();
    }

    Json(json!({
        "model": model,
        "created_at": "2024-01-01T00:00:00Z",
        "message": { "role": "assistant", "content": state.config.reply },
        "done": true,
    }))
    .into_response()
}

async fn tags(State(state): State<Arc<StubState>>) -> Response {
    if state.config.failing {
        return not_found();
    }

    let models: Vec<Value> = state
        .config
        .models
        .iter()
        .map(|name| json!({ "name": name, "size": 1, "digest": "sha256:0" }))
        .collect();
    Json(json!({ "models": models })).into_response()
}

/// A loopback URL with nothing listening behind it.
///
/// The port comes from the OS and is released before this returns, so
/// another process may bind it before a test connects. Linux hands out
/// ephemeral ports in sequence, which keeps that window to a handful of
/// concurrent binds on the same host.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("ephemeral port address");
    drop(listener);
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_url_refuses_connections() {
        let url = unreachable_url();
        let addr = url.trim_start_matches("http://");

        let err = std::net::TcpStream::connect(addr).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
    }
}
