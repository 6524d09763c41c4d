//! # Domain Models
//!
//! These structs represent the core entities of the community forum.
//! Wire shapes follow the backend: camelCase fields, Mongo-style `_id`
//! accepted wherever an `id` is expected.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{ForumError, Result};

/// Identifier of a post. Opaque; assigned by the backend or generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh time-ordered id for posts created before the backend confirms them.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a comment, unique across its post's whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Portal role of an actor. Patients are called `user` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "user", alias = "patient")]
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "user",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    /// Capitalized tag shown next to an author's name.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity attached to a post or comment.
///
/// A snapshot taken at creation time. Display labels are derived from it
/// (see [`crate::label`]) and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: Role,
    /// Only meaningful for doctors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            specialization: None,
        }
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }
}

/// A comment in its nested wire form, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: CommentId,
    pub author: Actor,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Chronological; appended to, never reordered.
    #[serde(default)]
    pub replies: Vec<Comment>,
}

/// A post with its top-level comments; nesting lives inside each [`Comment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: PostId,
    pub author: Actor,
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

// The backend sends `""` for posts without an image.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|url| !url.trim().is_empty()))
}

/// An image picked on the client but not uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Bytes,
}

/// Image state of a post being composed.
///
/// The preview and the file are the same value, so one cannot be cleared
/// while the other lingers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attachment {
    #[default]
    None,
    Pending(LocalImage),
    Uploaded(String),
}

impl Attachment {
    pub fn is_none(&self) -> bool {
        matches!(self, Attachment::None)
    }

    pub fn uploaded_url(&self) -> Option<&str> {
        match self {
            Attachment::Uploaded(url) => Some(url),
            _ => None,
        }
    }
}

/// A post as composed by the current actor, before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub content: String,
    pub attachment: Attachment,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment: Attachment::None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn attach(&mut self, image: LocalImage) {
        self.attachment = Attachment::Pending(image);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = Attachment::None;
    }

    /// Content may only be blank when an image is attached.
    pub fn validate(&self) -> Result<()> {
        match &self.attachment {
            Attachment::None if self.content.trim().is_empty() => Err(ForumError::Validation(
                "post content must not be empty without an image".into(),
            )),
            Attachment::Pending(image) if image.bytes.is_empty() => Err(
                ForumError::Validation(format!("attached image {} is empty", image.file_name)),
            ),
            Attachment::Uploaded(url) if url.trim().is_empty() => {
                Err(ForumError::Validation("attached image URL is blank".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn trimmed_content(&self) -> &str {
        self.content.trim()
    }
}

/// Body of a comment submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
}

/// Trims `raw` and rejects it when nothing is left.
pub fn require_content<'a>(raw: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ForumError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_post_shape() {
        let post: Post = serde_json::from_value(json!({
            "_id": "p1",
            "author": { "_id": "u1", "name": "Alice", "email": "a@x.io", "role": "user" },
            "content": "What helps with stress?",
            "imageUrl": "",
            "createdAt": "2026-10-01T09:00:00Z",
            "comments": [{
                "_id": "c1",
                "author": { "_id": "d1", "name": "Smith", "role": "doctor", "specialization": "Psychiatry" },
                "content": "Exercise.",
                "createdAt": "2026-10-01T10:00:00Z"
            }]
        }))
        .unwrap();

        assert_eq!(post.id.as_str(), "p1");
        assert_eq!(post.author.role, Role::Patient);
        assert_eq!(post.image_url, None);
        assert_eq!(post.comments[0].author.specialization.as_deref(), Some("Psychiatry"));
        assert!(post.comments[0].replies.is_empty());
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_value(Role::Patient).unwrap(), json!("user"));
        let role: Role = serde_json::from_value(json!("patient")).unwrap();
        assert_eq!(role, Role::Patient);
        assert_eq!(Role::Doctor.title(), "Doctor");
    }

    #[test]
    fn test_draft_requires_content_or_image() {
        assert!(matches!(
            PostDraft::new("   ").validate(),
            Err(ForumError::Validation(_))
        ));

        let mut draft = PostDraft::new("");
        draft.attach(LocalImage {
            file_name: "x.png".into(),
            content_type: mime::IMAGE_PNG,
            bytes: Bytes::from_static(b"\x89PNG"),
        });
        assert!(draft.validate().is_ok());

        draft.clear_attachment();
        assert!(draft.attachment.is_none());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_new_comment_omits_missing_parent() {
        let body = NewComment {
            content: "hi".into(),
            parent_comment_id: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "content": "hi" }));
    }
}
