pub mod openai;
#[cfg(test)]
pub mod testing;

pub use openai::OpenAiChatClient;

use crate::error::RouterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A chat-completion model.
///
/// Implementations map transport and rate-limit failures to
/// [`RouterError::Retryable`] so callers can wrap them in the retry policy.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation; with `json_mode` the reply must be a JSON object
    async fn complete(&self, messages: Vec<Message>, json_mode: bool) -> Result<String, RouterError>;
}

/// Strip a Markdown code fence some models wrap around JSON replies
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
