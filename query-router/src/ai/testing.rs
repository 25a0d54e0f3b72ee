//! Test doubles for [`ChatModel`]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatModel, Message, MessageRole};
use crate::error::RouterError;

/// Replays canned replies in order and records every prompt it was sent
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, RouterError>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, RouterError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Last user message of the n-th call
    pub fn user_message(&self, call: usize) -> Option<String> {
        self.last_with_role(call, MessageRole::User)
    }

    pub fn system_message(&self, call: usize) -> Option<String> {
        self.last_with_role(call, MessageRole::System)
    }

    fn last_with_role(&self, call: usize, role: MessageRole) -> Option<String> {
        self.prompts.lock().get(call).and_then(|messages| {
            messages
                .iter()
                .rev()
                .find(|m| m.role == role)
                .map(|m| m.content.clone())
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: Vec<Message>, _json_mode: bool) -> Result<String, RouterError> {
        self.prompts.lock().push(messages);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RouterError::upstream("no scripted reply")))
    }
}
