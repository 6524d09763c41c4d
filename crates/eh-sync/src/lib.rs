//! # eh-sync
//!
//! Keeps the local thread tree in step with the forum backend and runs the
//! health assistant conversation.

pub mod assistant;
pub mod guard;
pub mod service;

pub use assistant::{AssistantSession, EMPTY_REPLY, SYSTEM_PROMPT};
pub use guard::SubmissionKey;
pub use service::{ForumService, SyncOptions, SyncOutcome};
