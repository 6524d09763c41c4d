//! # ForumError
//!
//! Centralized error handling for the Equihealth forum crates.
//! Local failures (validation, missing targets, no signed-in actor) are kept
//! apart from failures of the remote backend.

use thiserror::Error;

/// The primary error type for all eh-core and eh-sync operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForumError {
    /// Input rejected before anything is mutated or sent (e.g., blank reply)
    #[error("validation error: {0}")]
    Validation(String),

    /// Target post or parent comment is not in the local tree
    #[error("{kind} not found with ID {id}")]
    NotFound { kind: &'static str, id: String },

    /// No current actor; the caller must sign in first
    #[error("sign in required")]
    AuthRequired,

    /// Network or server failure while talking to the forum backend
    #[error("remote sync failed: {0}")]
    RemoteSync(String),

    /// Duplicate identity or a submission for the same target still in flight
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ForumError {
    pub fn post_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "post",
            id: id.to_string(),
        }
    }

    pub fn comment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "comment",
            id: id.to_string(),
        }
    }

    /// Wraps an adapter failure, keeping the whole context chain.
    pub fn remote(err: anyhow::Error) -> Self {
        Self::RemoteSync(format!("{err:#}"))
    }

    /// Whether re-issuing the same action later might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteSync(_) | Self::Conflict(_))
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, ForumError>;
