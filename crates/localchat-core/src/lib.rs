pub mod ai;
pub mod api;
pub mod config;
pub mod relay;
pub mod session;
pub mod state;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use ai::{OllamaClient, OllamaError};
pub use config::Config;
pub use relay::{ChatRequest, Relay, RelayError};
pub use session::{PendingRequest, RequestId, Session, SessionState};
pub use state::{ChatMessage, ChatRole};
