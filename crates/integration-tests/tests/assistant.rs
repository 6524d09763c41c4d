//! Health assistant over HTTP.

use std::sync::Arc;

use eh_core::{ChatHistory, ChatRole, ForumError};
use eh_http::{ApiClient, HttpAssistantApi, NoAuth};
use eh_sync::{AssistantSession, SYSTEM_PROMPT};
use integration_tests::FakeBackend;

async fn session(backend: &FakeBackend) -> AssistantSession {
    let client = ApiClient::new(backend.spawn().await, Arc::new(NoAuth));
    AssistantSession::new(Arc::new(HttpAssistantApi::new(client)), ChatHistory::default())
}

#[tokio::test]
async fn test_replies_and_replays_recent_history() {
    let backend = FakeBackend::default();
    let session = session(&backend).await;

    for question in ["one", "two", "three"] {
        let reply = session.send(question).await.unwrap();
        assert_eq!(reply, format!("You said: {question}"));
    }

    let requests = backend.state().chat_requests.clone();
    let last = requests.last().unwrap();
    assert_eq!(last[0].role, ChatRole::System);
    assert_eq!(last[0].content, SYSTEM_PROMPT);
    // System prompt, two retained pairs, the new question.
    assert_eq!(last.len(), 6);
    assert_eq!(last[5].content, "three");
    assert_eq!(session.history().await.len(), 4);
}

#[tokio::test]
async fn test_backend_failure_records_nothing() {
    let backend = FakeBackend::default();
    let session = session(&backend).await;
    backend.state().fail_next = true;

    let err = session.send("hello?").await.unwrap_err();
    assert!(matches!(err, ForumError::RemoteSync(_)));
    assert!(session.history().await.is_empty());
}
