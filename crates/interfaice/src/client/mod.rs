//! The chat collaborator: request/response types and clients.

pub mod chat;
pub mod config;
pub mod mock;
pub mod openai;

pub use chat::*;
pub use config::{ClientConfig, ConfigError};
pub use mock::{MOCK_ANSWER, MockChatClient};
pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::core::ChatError;

/// A request/response service that produces the model's textual answer.
///
/// Implementations own transport concerns: retries, timeouts and rate limits
/// are theirs to handle.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;
}
