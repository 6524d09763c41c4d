//! # eh-http
//!
//! `reqwest` adapters for the portal backend: the community forum, the
//! health assistant and the signed-in user lookup.

pub mod assistant;
pub mod client;
pub mod forum;
pub mod identity;

pub use assistant::HttpAssistantApi;
pub use client::{ApiClient, ApiError, NoAuth, StaticToken, TokenSource};
pub use forum::HttpForumApi;
pub use identity::RemoteIdentity;
