//! JSON bodies returned by the relay's HTTP surface.

use serde::{Deserialize, Serialize};

use crate::relay::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    pub details: String,
    pub suggestion: String,
}

impl From<&RelayError> for ChatFailure {
    fn from(e: &RelayError) -> Self {
        Self {
            error: e.category().to_string(),
            details: e.details(),
            suggestion: e.suggestion().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub models: Vec<String>,
}

/// Failure body for the model listing; `models` is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListFailure {
    pub error: String,
    pub details: String,
    pub models: Vec<String>,
}

impl From<&RelayError> for ModelListFailure {
    fn from(e: &RelayError) -> Self {
        Self {
            error: e.category().to_string(),
            details: e.details(),
            models: Vec::new(),
        }
    }
}
