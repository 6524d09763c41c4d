//! Single-flight bookkeeping for submissions.
//!
//! Comments carry no idempotency key, so a second submission to the same
//! target while the first is still travelling would create a duplicate node.

use std::fmt;

use dashmap::DashSet;
use eh_core::{CommentId, ForumError, PostId, Result};

/// What a submission writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubmissionKey {
    NewPost,
    Reply {
        post: PostId,
        parent: Option<CommentId>,
    },
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionKey::NewPost => f.write_str("new post"),
            SubmissionKey::Reply { post, parent: None } => write!(f, "comment on post {post}"),
            SubmissionKey::Reply {
                post,
                parent: Some(parent),
            } => write!(f, "reply to comment {parent} on post {post}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct InFlight {
    pending: DashSet<SubmissionKey>,
}

impl InFlight {
    /// Claims `key`, or fails with `Conflict` while it is already claimed.
    pub fn try_begin(&self, key: SubmissionKey) -> Result<InFlightGuard<'_>> {
        if !self.pending.insert(key.clone()) {
            return Err(ForumError::Conflict(format!("{key} is already being submitted")));
        }
        Ok(InFlightGuard { owner: self, key })
    }

    pub fn is_pending(&self, key: &SubmissionKey) -> bool {
        self.pending.contains(key)
    }
}

/// Releases its key on drop, including when the submitting future is dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: SubmissionKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.pending.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_conflicts_until_release() {
        let in_flight = InFlight::default();
        let key = SubmissionKey::Reply {
            post: PostId::new("p1"),
            parent: Some(CommentId::new("c1")),
        };

        let guard = in_flight.try_begin(key.clone()).unwrap();
        assert!(matches!(
            in_flight.try_begin(key.clone()),
            Err(ForumError::Conflict(_))
        ));

        let other = SubmissionKey::Reply {
            post: PostId::new("p1"),
            parent: None,
        };
        assert!(in_flight.try_begin(other).is_ok());

        drop(guard);
        assert!(!in_flight.is_pending(&key));
        assert!(in_flight.try_begin(key).is_ok());
    }
}
