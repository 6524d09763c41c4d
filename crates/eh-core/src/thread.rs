//! # ThreadStore
//!
//! In-memory collection of discussion threads.
//!
//! Each [`Thread`] keeps its comments in a flat arena keyed by [`CommentId`];
//! a node knows its parent and the ordered ids of its replies. Attaching a
//! reply is a map lookup plus a push onto one `children` list, so nodes off
//! the root-to-parent path are never touched.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{ForumError, Result};
use crate::models::{require_content, Actor, Comment, CommentId, Post, PostId};

/// A comment stored in a thread's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub id: CommentId,
    pub author: Actor,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// `None` for top-level comments.
    pub parent: Option<CommentId>,
    children: Vec<CommentId>,
}

impl CommentNode {
    /// Direct replies, oldest first.
    pub fn children(&self) -> &[CommentId] {
        &self.children
    }
}

/// A post together with its whole comment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    id: PostId,
    author: Actor,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    nodes: HashMap<CommentId, CommentNode>,
    roots: Vec<CommentId>,
    // Ids of removed comments; never handed out again.
    retired: HashSet<CommentId>,
}

impl Thread {
    fn new(
        id: PostId,
        author: Actor,
        content: String,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author,
            content,
            image_url,
            created_at,
            nodes: HashMap::new(),
            roots: Vec::new(),
            retired: HashSet::new(),
        }
    }

    /// Builds the arena from the nested wire shape.
    ///
    /// Fails with `Conflict` when a comment id occurs twice in the tree.
    pub fn from_post(post: Post) -> Result<Self> {
        let mut thread = Self::new(
            post.id,
            post.author,
            post.content,
            post.image_url,
            post.created_at,
        );
        for comment in post.comments {
            thread.append(None, comment)?;
        }
        Ok(thread)
    }

    pub fn id(&self) -> &PostId {
        &self.id
    }

    pub fn author(&self) -> &Actor {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn comment(&self, id: &CommentId) -> Option<&CommentNode> {
        self.nodes.get(id)
    }

    pub fn contains_comment(&self, id: &CommentId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of comments at every depth.
    pub fn comment_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &CommentNode> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Lazy depth-first, pre-order walk of the comment forest.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            thread: self,
            stack: self.roots.iter().rev().map(|id| (id, 0)).collect(),
        }
    }

    /// Attaches `comment` (and any replies it already carries) under `parent`,
    /// or at the top level when `parent` is `None`.
    ///
    /// All checks run before the arena is touched, so a failed call leaves
    /// the thread exactly as it was.
    pub fn append(&mut self, parent: Option<&CommentId>, comment: Comment) -> Result<CommentId> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(ForumError::comment_not_found(parent_id));
            }
        }

        let mut incoming = HashSet::new();
        let mut pending = vec![&comment];
        while let Some(next) = pending.pop() {
            if self.nodes.contains_key(&next.id)
                || self.retired.contains(&next.id)
                || !incoming.insert(&next.id)
            {
                return Err(ForumError::Conflict(format!(
                    "comment id {} already used in post {}",
                    next.id, self.id
                )));
            }
            pending.extend(next.replies.iter());
        }

        let id = comment.id.clone();
        self.insert_subtree(parent.cloned(), comment);
        let siblings = match parent {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent_node) => &mut parent_node.children,
                None => return Err(ForumError::comment_not_found(parent_id)),
            },
            None => &mut self.roots,
        };
        siblings.push(id.clone());
        Ok(id)
    }

    fn insert_subtree(&mut self, parent: Option<CommentId>, comment: Comment) {
        let mut pending = vec![(parent, comment)];
        while let Some((parent, comment)) = pending.pop() {
            let Comment {
                id,
                author,
                content,
                created_at,
                replies,
            } = comment;

            let children = replies.iter().map(|reply| reply.id.clone()).collect();
            pending.extend(replies.into_iter().map(|reply| (Some(id.clone()), reply)));
            self.nodes.insert(
                id.clone(),
                CommentNode {
                    id,
                    author,
                    content,
                    created_at,
                    parent,
                    children,
                },
            );
        }
    }

    /// Detaches `id` and its whole subtree, returning it in nested form.
    pub fn remove(&mut self, id: &CommentId) -> Result<Comment> {
        let removed = self
            .materialize(id)
            .ok_or_else(|| ForumError::comment_not_found(id))?;

        let parent = self.nodes.get(id).and_then(|node| node.parent.clone());
        let siblings = match parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => &mut parent_node.children,
            None => &mut self.roots,
        };
        siblings.retain(|sibling| sibling != id);

        let mut doomed = vec![id.clone()];
        while let Some(next) = doomed.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                doomed.extend(node.children);
            }
            self.retired.insert(next);
        }
        Ok(removed)
    }

    // Builds bottom-up from a pre-order listing; every child follows its
    // parent in `order`, so replies are complete before their parent.
    fn materialize(&self, id: &CommentId) -> Option<Comment> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(next) {
                order.push(node);
                stack.extend(node.children.iter());
            }
        }

        let mut built: HashMap<&CommentId, Comment> = HashMap::with_capacity(order.len());
        for node in order.into_iter().rev() {
            let replies = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                &node.id,
                Comment {
                    id: node.id.clone(),
                    author: node.author.clone(),
                    content: node.content.clone(),
                    created_at: node.created_at,
                    replies,
                },
            );
        }
        built.remove(id)
    }

    /// Re-materializes the nested wire shape.
    pub fn to_post(&self) -> Post {
        Post {
            id: self.id.clone(),
            author: self.author.clone(),
            content: self.content.clone(),
            image_url: self.image_url.clone(),
            comments: self
                .roots
                .iter()
                .filter_map(|id| self.materialize(id))
                .collect(),
            created_at: self.created_at,
        }
    }
}

/// One row of a flattened thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatComment<'a> {
    pub comment: &'a CommentNode,
    /// 0 for top-level comments.
    pub depth: usize,
}

/// Pre-order iterator returned by [`Thread::flatten`].
#[derive(Debug, Clone)]
pub struct Flatten<'a> {
    thread: &'a Thread,
    stack: Vec<(&'a CommentId, usize)>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlatComment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            let Some(node) = self.thread.nodes.get(id) else {
                continue;
            };
            self.stack
                .extend(node.children.iter().rev().map(|child| (child, depth + 1)));
            return Some(FlatComment {
                comment: node,
                depth,
            });
        }
        None
    }
}

/// The local view of the forum, most recent post first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadStore {
    threads: Vec<Thread>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a backend snapshot, keeping its order.
    pub fn from_posts(posts: Vec<Post>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut threads = Vec::with_capacity(posts.len());
        for post in posts {
            if !seen.insert(post.id.clone()) {
                return Err(ForumError::Conflict(format!(
                    "post id {} appears twice",
                    post.id
                )));
            }
            threads.push(Thread::from_post(post)?);
        }
        Ok(Self { threads })
    }

    /// Last-writer-wins: the snapshot replaces the whole local tree.
    /// A rejected snapshot leaves the store untouched.
    pub fn replace_all(&mut self, posts: Vec<Post>) -> Result<()> {
        *self = Self::from_posts(posts)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.threads.clear();
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    pub fn get(&self, id: &PostId) -> Option<&Thread> {
        self.threads.iter().find(|thread| &thread.id == id)
    }

    pub fn contains_post(&self, id: &PostId) -> bool {
        self.get(id).is_some()
    }

    pub fn contains_comment(&self, post_id: &PostId, comment_id: &CommentId) -> bool {
        self.get(post_id)
            .is_some_and(|thread| thread.contains_comment(comment_id))
    }

    fn thread_mut(&mut self, id: &PostId) -> Result<&mut Thread> {
        self.threads
            .iter_mut()
            .find(|thread| &thread.id == id)
            .ok_or_else(|| ForumError::post_not_found(id))
    }

    /// Creates a local post at the head of the list.
    ///
    /// `content` may be blank only when `image_url` is given.
    pub fn create_post(
        &mut self,
        author: Actor,
        content: &str,
        image_url: Option<String>,
    ) -> Result<&Thread> {
        let image_url = image_url.filter(|url| !url.trim().is_empty());
        let content = content.trim();
        if content.is_empty() && image_url.is_none() {
            return Err(ForumError::Validation(
                "post content must not be empty without an image".into(),
            ));
        }

        let thread = Thread::new(
            PostId::generate(),
            author,
            content.to_string(),
            image_url,
            Utc::now(),
        );
        self.threads.insert(0, thread);
        Ok(&self.threads[0])
    }

    /// Prepends a post confirmed by the backend.
    pub fn insert_post(&mut self, post: Post) -> Result<&Thread> {
        if self.contains_post(&post.id) {
            return Err(ForumError::Conflict(format!(
                "post id {} already present",
                post.id
            )));
        }
        self.threads.insert(0, Thread::from_post(post)?);
        Ok(&self.threads[0])
    }

    /// Adds a comment by `author`, top-level or as a reply to `parent`.
    ///
    /// An unknown `parent` is a `NotFound`; the comment is never attached
    /// anywhere else.
    pub fn add_comment(
        &mut self,
        post_id: &PostId,
        author: Actor,
        content: &str,
        parent: Option<&CommentId>,
    ) -> Result<CommentId> {
        let content = require_content(content, "comment")?;
        let thread = self.thread_mut(post_id)?;
        thread.append(
            parent,
            Comment {
                id: CommentId::generate(),
                author,
                content: content.to_string(),
                created_at: Utc::now(),
                replies: Vec::new(),
            },
        )
    }

    /// Splices a comment confirmed by the backend.
    pub fn insert_comment(
        &mut self,
        post_id: &PostId,
        parent: Option<&CommentId>,
        comment: Comment,
    ) -> Result<CommentId> {
        self.thread_mut(post_id)?.append(parent, comment)
    }

    pub fn remove_comment(&mut self, post_id: &PostId, comment_id: &CommentId) -> Result<Comment> {
        self.thread_mut(post_id)?.remove(comment_id)
    }

    pub fn flatten(&self, post_id: &PostId) -> Result<Flatten<'_>> {
        self.get(post_id)
            .map(Thread::flatten)
            .ok_or_else(|| ForumError::post_not_found(post_id))
    }
}
