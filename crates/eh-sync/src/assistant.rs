//! Health assistant chat with a bounded replayed context.

use std::sync::Arc;

use eh_core::{require_content, AssistantApi, ChatHistory, ChatMessage, ForumError, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You are the health assistant of the Equihealth portal. \
Help with general health questions in a friendly, informative way. \
You are not a doctor and cannot provide medical diagnoses.";

/// Shown when the assistant answers with nothing.
pub const EMPTY_REPLY: &str = "Sorry, I could not understand that.";

pub struct AssistantSession {
    api: Arc<dyn AssistantApi>,
    system_prompt: String,
    history: Mutex<ChatHistory>,
}

impl AssistantSession {
    pub fn new(api: Arc<dyn AssistantApi>, history: ChatHistory) -> Self {
        Self {
            api,
            system_prompt: SYSTEM_PROMPT.to_string(),
            history: Mutex::new(history),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Copy of the retained context, e.g. for persisting between runs.
    pub async fn history(&self) -> ChatHistory {
        self.history.lock().await.clone()
    }

    /// Sends `text` with the retained context and records the exchange.
    /// A failed call records nothing.
    pub async fn send(&self, text: &str) -> Result<String> {
        let text = require_content(text, "message")?;
        let context = self
            .history
            .lock()
            .await
            .request_context(&self.system_prompt, text);
        debug!(messages = context.len(), "asking health assistant");

        let reply = self.api.chat(&context).await.map_err(|e| {
            warn!(error = %e, "health assistant request failed");
            ForumError::remote(e)
        })?;
        let reply = if reply.trim().is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            reply
        };

        let mut history = self.history.lock().await;
        history.push(ChatMessage::user(text));
        history.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eh_core::{ChatRole, MockAssistantApi};

    #[tokio::test]
    async fn test_context_is_bounded_and_prefixed() {
        let mut api = MockAssistantApi::new();
        api.expect_chat()
            .withf(|messages| {
                messages.first().map(|m| m.role) == Some(ChatRole::System)
                    && messages.len() <= 2 + 4
            })
            .times(3)
            .returning(|messages| Ok(format!("echo {}", messages.len())));
        let session = AssistantSession::new(Arc::new(api), ChatHistory::new(4));

        assert_eq!(session.send("one").await.unwrap(), "echo 2");
        assert_eq!(session.send("two").await.unwrap(), "echo 4");
        assert_eq!(session.send("three").await.unwrap(), "echo 6");

        let kept: Vec<_> = session
            .history()
            .await
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(kept, vec!["two", "echo 4", "three", "echo 6"]);
    }

    #[tokio::test]
    async fn test_failure_records_nothing() {
        let mut api = MockAssistantApi::new();
        api.expect_chat()
            .returning(|_| Err(anyhow::anyhow!("HTTP 502: bad gateway")));
        let session = AssistantSession::new(Arc::new(api), ChatHistory::default());

        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, ForumError::RemoteSync(_)));
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_and_empty_reply() {
        let mut api = MockAssistantApi::new();
        api.expect_chat().times(1).returning(|_| Ok("  ".into()));
        let session = AssistantSession::new(Arc::new(api), ChatHistory::default());

        assert!(matches!(
            session.send("   ").await,
            Err(ForumError::Validation(_))
        ));
        assert_eq!(session.send("hi").await.unwrap(), EMPTY_REPLY);
    }
}
