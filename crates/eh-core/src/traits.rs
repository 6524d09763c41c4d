//! # Core Traits (Ports)
//!
//! Adapters for the forum backend, the identity source and the health
//! assistant implement these traits; `eh-sync` only talks to them.

use async_trait::async_trait;

use crate::history::ChatMessage;
use crate::models::{Actor, Comment, NewComment, Post, PostDraft, PostId};

/// Remote forum backend. Owns persistence; this side only calls it.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Every post, each with its fully nested comment tree.
    async fn list_posts(&self) -> anyhow::Result<Vec<Post>>;

    /// Creates a post; a pending image is uploaded along with it.
    async fn create_post(&self, draft: &PostDraft) -> anyhow::Result<Post>;

    /// Creates a comment or reply. Backends may answer without a body.
    async fn create_comment(
        &self,
        post_id: &PostId,
        comment: &NewComment,
    ) -> anyhow::Result<Option<Comment>>;
}

/// Source of the signed-in actor.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in; `Err` when the answer could
    /// not be obtained.
    async fn current_actor(&self) -> anyhow::Result<Option<Actor>>;
}

/// Health assistant chat backend.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}
