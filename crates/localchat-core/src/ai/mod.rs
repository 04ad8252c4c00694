pub mod ollama;

pub use ollama::{OllamaClient, OllamaError, OutboundMessage, OutboundRole, DEFAULT_OLLAMA_URL};
