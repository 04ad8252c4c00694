//! HTTP handlers for the chat relay and the model lister.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use localchat_core::api::{ChatFailure, ChatReply, ModelList, ModelListFailure};
use localchat_core::{ChatRequest, Relay, RelayError};

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/models", get(models))
        .with_state(relay)
}

fn error_status(e: &RelayError) -> StatusCode {
    if e.is_upstream() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// `POST /api/chat`
///
/// The body is taken raw so that malformed input gets the same
/// `{error, details, suggestion}` shape as upstream failures.
async fn chat(State(relay): State<Relay>, body: Bytes) -> Response {
    let result = match ChatRequest::from_json(&body) {
        Ok(request) => relay.chat(&request).await,
        Err(e) => {
            tracing::warn!(error = %e, "rejected chat request");
            Err(e)
        }
    };

    match result {
        Ok(message) => Json(ChatReply { message }).into_response(),
        Err(e) => (error_status(&e), Json(ChatFailure::from(&e))).into_response(),
    }
}

/// `GET /api/models`
async fn models(State(relay): State<Relay>) -> Response {
    match relay.list_models().await {
        Ok(models) => Json(ModelList { models }).into_response(),
        Err(e) => (error_status(&e), Json(ModelListFailure::from(&e))).into_response(),
    }
}
