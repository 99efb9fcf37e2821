/// Scripted completion client for tests and offline runs.
///
/// Replies are served in order from a queue; once the queue is empty the
/// fallback reply is returned. Every prompt received is recorded.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionClient, LlmError};

/// One queued outcome.
pub enum ScriptedReply {
    Text(String),
    Error(String),
}

pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Create a client that always answers with `fallback`.
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text reply.
    #[must_use]
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Error(message.into()));
        self
    }

    fn push(&self, reply: ScriptedReply) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new("```json\n{\"summary\": \"No issues found\", \"issues\": []}\n```")
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Error(msg)) => Err(LlmError::InvalidResponse(msg)),
            None => Ok(self.fallback.clone()),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
