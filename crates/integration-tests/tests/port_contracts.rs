//! `ForumService` driven through mocked ports and a real session identity.

use std::sync::Arc;

use chrono::Utc;
use eh_core::{Comment, CommentId, ForumError, MockForumApi, Post, PostDraft, PostId};
use eh_session::SessionIdentity;
use eh_sync::{ForumService, SyncOutcome};
use integration_tests::{member, seed_post};
use mockall::predicate::*;

#[tokio::test]
async fn test_sign_in_gates_every_write() {
    let mut api = MockForumApi::new();
    api.expect_list_posts()
        .returning(|| Ok(vec![seed_post("p1", member(), "Hello", Vec::new())]));
    api.expect_create_comment()
        .with(eq(PostId::new("p1")), always())
        .times(1)
        .returning(|_, body| {
            Ok(Some(Comment {
                id: CommentId::new("c1"),
                author: member(),
                content: body.content.clone(),
                created_at: Utc::now(),
                replies: Vec::new(),
            }))
        });
    api.expect_create_post().never();

    let identity = Arc::new(SessionIdentity::new());
    let forum = ForumService::new(Arc::new(api), identity.clone());
    forum.refresh().await.unwrap();

    let err = forum
        .add_comment(&PostId::new("p1"), "hi", None)
        .await
        .unwrap_err();
    assert_eq!(err, ForumError::AuthRequired);
    let err = forum.create_post(PostDraft::new("hi")).await.unwrap_err();
    assert_eq!(err, ForumError::AuthRequired);

    identity.sign_in(member()).await.unwrap();
    let outcome = forum.add_comment(&PostId::new("p1"), "hi", None).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Refreshed);

    identity.sign_out().await;
    let err = forum.create_post(PostDraft::new("again")).await.unwrap_err();
    assert_eq!(err, ForumError::AuthRequired);
}

#[tokio::test]
async fn test_duplicate_snapshot_is_rejected() {
    let mut api = MockForumApi::new();
    let dup: Vec<Post> = vec![
        seed_post("p1", member(), "a", Vec::new()),
        seed_post("p1", member(), "b", Vec::new()),
    ];
    api.expect_list_posts().returning(move || Ok(dup.clone()));

    let forum = ForumService::new(
        Arc::new(api),
        Arc::new(SessionIdentity::signed_in(member())),
    );
    let err = forum.refresh().await.unwrap_err();
    assert!(matches!(err, ForumError::RemoteSync(_)));
    assert!(forum.snapshot().await.is_empty());
}
