//! # ForumService
//!
//! Coordinates the local [`ThreadStore`] with the remote forum backend.
//!
//! Every mutating call follows the same order: signed-in actor, local
//! validation, local existence checks, in-flight claim, remote call, and only
//! then a change to the local tree. Any failure before the last step leaves
//! the tree as it was.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use eh_core::{
    require_content, Actor, CommentId, ForumApi, ForumError, IdentityProvider, NewComment, Post,
    PostDraft, PostId, Result, ThreadStore,
};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::guard::{InFlight, SubmissionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Re-fetch the whole forum after a successful comment instead of
    /// splicing the returned node.
    pub refresh_after_write: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            refresh_after_write: true,
        }
    }
}

/// How a successful remote call ended up in the local tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New post prepended.
    Posted(PostId),
    /// Confirmed comment attached in place.
    Spliced(CommentId),
    /// Local tree replaced by the server snapshot.
    Refreshed,
    /// The view was closed or the target vanished while the request was out.
    Discarded,
    /// The server accepted the write but the local tree could not be brought
    /// up to date. Retrying would write twice; refresh instead.
    Committed,
}

pub struct ForumService {
    api: Arc<dyn ForumApi>,
    identity: Arc<dyn IdentityProvider>,
    store: RwLock<ThreadStore>,
    // Bumped by `close_view`; responses from an older epoch are dropped.
    epoch: AtomicU64,
    in_flight: InFlight,
    options: SyncOptions,
}

impl ForumService {
    pub fn new(api: Arc<dyn ForumApi>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            api,
            identity,
            store: RwLock::new(ThreadStore::new()),
            epoch: AtomicU64::new(0),
            in_flight: InFlight::default(),
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Read access to the local tree. Do not hold across an `.await` on
    /// this service.
    pub async fn store(&self) -> RwLockReadGuard<'_, ThreadStore> {
        self.store.read().await
    }

    /// The local tree in nested wire form.
    pub async fn snapshot(&self) -> Vec<Post> {
        self.store.read().await.posts().map(|t| t.to_post()).collect()
    }

    pub fn is_pending(&self, key: &SubmissionKey) -> bool {
        self.in_flight.is_pending(key)
    }

    /// Drops the local tree. Requests still in flight finish as `Discarded`.
    pub async fn close_view(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store.write().await.clear();
        debug!("forum view closed");
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    async fn require_actor(&self) -> Result<Actor> {
        let actor = self.identity.current_actor().await.map_err(|e| {
            warn!(error = %e, "failed to resolve the signed-in actor");
            ForumError::remote(e)
        })?;
        actor.ok_or(ForumError::AuthRequired)
    }

    /// Replaces the local tree with the server's (last writer wins).
    pub async fn refresh(&self) -> Result<SyncOutcome> {
        let epoch = self.current_epoch();
        let posts = self.api.list_posts().await.map_err(|e| {
            warn!(error = %e, "failed to fetch forum posts");
            ForumError::remote(e)
        })?;

        let mut store = self.store.write().await;
        if self.current_epoch() != epoch {
            warn!("dropping forum snapshot for a closed view");
            return Ok(SyncOutcome::Discarded);
        }
        let count = posts.len();
        store
            .replace_all(posts)
            .map_err(|e| ForumError::RemoteSync(format!("server snapshot rejected: {e}")))?;
        info!(posts = count, "forum refreshed");
        Ok(SyncOutcome::Refreshed)
    }

    /// Publishes `draft` and prepends the server's copy of the post.
    pub async fn create_post(&self, draft: PostDraft) -> Result<SyncOutcome> {
        let actor = self.require_actor().await?;
        draft.validate()?;
        let _claim = self.in_flight.try_begin(SubmissionKey::NewPost)?;

        let epoch = self.current_epoch();
        let post = self.api.create_post(&draft).await.map_err(|e| {
            warn!(actor = %actor.id, error = %e, "failed to create post");
            ForumError::remote(e)
        })?;
        let id = post.id.clone();

        let mut store = self.store.write().await;
        if self.current_epoch() != epoch {
            warn!(post = %id, "post created after the view closed");
            return Ok(SyncOutcome::Discarded);
        }
        match store.insert_post(post).map(|_| ()) {
            Ok(()) => {}
            Err(ForumError::Conflict(_)) if store.contains_post(&id) => {
                debug!(post = %id, "post already present after a refresh");
            }
            Err(e) => {
                warn!(post = %id, error = %e, "post saved but rejected by the local tree");
                return Ok(SyncOutcome::Committed);
            }
        }
        info!(actor = %actor.id, post = %id, "post created");
        Ok(SyncOutcome::Posted(id))
    }

    /// Submits a comment on `post_id`, or a reply to `parent` within it.
    ///
    /// Both targets must exist locally before anything is sent.
    pub async fn add_comment(
        &self,
        post_id: &PostId,
        content: &str,
        parent: Option<&CommentId>,
    ) -> Result<SyncOutcome> {
        let actor = self.require_actor().await?;
        let content = require_content(content, "comment")?;
        {
            let store = self.store.read().await;
            let thread = store
                .get(post_id)
                .ok_or_else(|| ForumError::post_not_found(post_id))?;
            if let Some(parent_id) = parent {
                if !thread.contains_comment(parent_id) {
                    return Err(ForumError::comment_not_found(parent_id));
                }
            }
        }
        let _claim = self.in_flight.try_begin(SubmissionKey::Reply {
            post: post_id.clone(),
            parent: parent.cloned(),
        })?;

        let epoch = self.current_epoch();
        let body = NewComment {
            content: content.to_string(),
            parent_comment_id: parent.cloned(),
        };
        let created = self
            .api
            .create_comment(post_id, &body)
            .await
            .map_err(|e| {
                warn!(actor = %actor.id, post = %post_id, error = %e, "failed to create comment");
                ForumError::remote(e)
            })?;
        info!(actor = %actor.id, post = %post_id, "comment created");

        if self.current_epoch() != epoch {
            warn!(post = %post_id, "comment created after the view closed");
            return Ok(SyncOutcome::Discarded);
        }
        match created {
            Some(comment) if !self.options.refresh_after_write => {
                self.splice(epoch, post_id, parent, comment).await
            }
            _ => self.refresh_after_write(post_id).await,
        }
    }

    async fn refresh_after_write(&self, post_id: &PostId) -> Result<SyncOutcome> {
        match self.refresh().await {
            Err(ForumError::RemoteSync(reason)) => {
                warn!(post = %post_id, %reason, "comment saved but the forum could not be refreshed");
                Ok(SyncOutcome::Committed)
            }
            other => other,
        }
    }

    async fn splice(
        &self,
        epoch: u64,
        post_id: &PostId,
        parent: Option<&CommentId>,
        comment: eh_core::Comment,
    ) -> Result<SyncOutcome> {
        let mut store = self.store.write().await;
        let target_present = store.contains_post(post_id)
            && parent.is_none_or(|parent_id| store.contains_comment(post_id, parent_id));
        if self.current_epoch() != epoch || !target_present {
            warn!(post = %post_id, "reply target vanished before the response arrived");
            return Ok(SyncOutcome::Discarded);
        }

        let id = comment.id.clone();
        match store.insert_comment(post_id, parent, comment) {
            Ok(_) => Ok(SyncOutcome::Spliced(id)),
            Err(ForumError::Conflict(_)) if store.contains_comment(post_id, &id) => {
                debug!(comment = %id, "comment already present");
                Ok(SyncOutcome::Spliced(id))
            }
            Err(e) => {
                warn!(comment = %id, error = %e, "comment saved but rejected by the local tree");
                Ok(SyncOutcome::Committed)
            }
        }
    }
}
