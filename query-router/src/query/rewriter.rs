//! Rewrites follow-up questions using recent chat history

use std::sync::Arc;

use serde::Deserialize;

use crate::ai::{strip_code_fence, ChatModel, Message};
use crate::error::RouterError;
use crate::models::ChatMessage;
use crate::retry::{with_retry, RetryPolicy};

/// Messages of history the model sees (three exchanges)
pub const HISTORY_WINDOW: usize = 6;

const SYSTEM_PROMPT: &str = "You refine user queries using recent chat history. You receive the \
recent messages of a conversation between a user and a bot, followed by a new user query. If the \
new query depends on context it does not contain, rewrite it so it is self-sufficient by adding the \
missing context from the history. If it is already understandable on its own, return it unchanged.\n\n\
Example: history says \"What is the price of unit 103?\" and the new query is \"Is it sold?\"; the \
rewritten query is \"Is unit 103 sold?\".\n\n\
Respond with a JSON object: {\"query\": \"<query>\"}. Do not add any explanation.";

#[derive(Debug, Deserialize)]
struct Rewritten {
    query: String,
}

pub struct ContextRewriter {
    model: Arc<dyn ChatModel>,
    policy: RetryPolicy,
}

impl ContextRewriter {
    pub fn new(model: Arc<dyn ChatModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    /// Self-sufficient version of `query` given `history`.
    ///
    /// Without history the query is returned as is. If the model cannot
    /// produce a usable rewrite the original query is kept.
    pub async fn rewrite(&self, history: &[ChatMessage], query: &str) -> String {
        if history.is_empty() || query.trim().is_empty() {
            return query.to_string();
        }

        let window = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
        let transcript = window
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.text))
            .collect::<Vec<_>>()
            .join("\n");
        let user_prompt = format!("chat_history:\n{}\n\nnew_query: {}", transcript, query);

        let result = with_retry(&self.policy, "rewrite", || self.rewrite_once(&user_prompt)).await;
        match result {
            Ok(rewritten) => {
                if rewritten != query {
                    log::info!("[REWRITER] '{}' -> '{}'", query, rewritten);
                }
                rewritten
            }
            Err(e) => {
                log::warn!("[REWRITER] Keeping original query, rewrite failed: {}", e);
                query.to_string()
            }
        }
    }

    async fn rewrite_once(&self, user_prompt: &str) -> Result<String, RouterError> {
        let content = self
            .model
            .complete(vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt)], true)
            .await?;

        let parsed: Rewritten = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| RouterError::retryable(format!("malformed rewrite: {}", e)))?;

        let query = parsed.query.trim();
        if query.is_empty() {
            return Err(RouterError::retryable("empty rewrite"));
        }
        Ok(query.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use crate::models::ChatRole;

    fn history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(ChatRole::User, "What is the price of unit 103?"),
            ChatMessage::new(ChatRole::Bot, "The price of unit 103 is $500,000."),
        ]
    }

    #[tokio::test]
    async fn test_no_history_passes_through() {
        let model = ScriptedModel::replying(&[]);
        let rewriter = ContextRewriter::new(model.clone(), RetryPolicy::immediate(2));

        assert_eq!(rewriter.rewrite(&[], "Is it sold?").await, "Is it sold?");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_rewrites_with_history() {
        let model = ScriptedModel::replying(&[r#"{"query": "Is unit 103 sold?"}"#]);
        let rewriter = ContextRewriter::new(model.clone(), RetryPolicy::immediate(2));

        let rewritten = rewriter.rewrite(&history(), "Is it sold?").await;
        assert_eq!(rewritten, "Is unit 103 sold?");

        let prompt = model.user_message(0).unwrap();
        assert!(prompt.contains("user: What is the price of unit 103?"));
        assert!(prompt.ends_with("new_query: Is it sold?"));
    }

    #[tokio::test]
    async fn test_only_recent_window_is_sent() {
        let model = ScriptedModel::replying(&[r#"{"query": "q"}"#]);
        let rewriter = ContextRewriter::new(model.clone(), RetryPolicy::immediate(1));

        let long_history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::new(ChatRole::User, format!("message {}", i)))
            .collect();
        rewriter.rewrite(&long_history, "q").await;

        let prompt = model.user_message(0).unwrap();
        assert!(!prompt.contains("message 3"));
        assert!(prompt.contains("message 4"));
        assert!(prompt.contains("message 9"));
    }

    #[tokio::test]
    async fn test_falls_back_on_bad_reply() {
        let model = ScriptedModel::replying(&["nope", "{}"]);
        let rewriter = ContextRewriter::new(model.clone(), RetryPolicy::immediate(2));

        assert_eq!(rewriter.rewrite(&history(), "Is it sold?").await, "Is it sold?");
        assert_eq!(model.calls(), 2);
    }
}
