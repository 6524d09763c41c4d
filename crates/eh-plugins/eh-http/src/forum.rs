//! `ForumApi` over the portal's REST endpoints.

use async_trait::async_trait;
use eh_core::{Attachment, Comment, ForumApi, NewComment, Post, PostDraft, PostId};
use reqwest::multipart::{Form, Part};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{from_json_unbounded, ApiClient, ApiError};

const POSTS_PATH: &str = "community/posts";

pub struct HttpForumApi {
    client: ApiClient,
}

impl HttpForumApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn comments_url(&self, post_id: &PostId) -> Result<reqwest::Url, ApiError> {
        self.client
            .endpoint(&["community", "posts", post_id.as_str(), "comments"])
    }
}

#[derive(Deserialize)]
struct PostPage {
    posts: Vec<Post>,
}

// Some deployments wrap payloads in an object, others send them bare.
// The list is told apart by its first byte: an untagged enum would buffer
// the whole nested tree before the depth-safe parser could see it.
fn parse_post_list(body: &str) -> serde_json::Result<Vec<Post>> {
    if body.trim_start().starts_with('{') {
        from_json_unbounded::<PostPage>(body).map(|page| page.posts)
    } else {
        from_json_unbounded(body)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PostEnvelope {
    Bare(Post),
    Wrapped { post: Post },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommentEnvelope {
    Wrapped { comment: Comment },
    Bare(Comment),
}

// A bare body carrying `comments` is a post, not the created comment.
#[derive(Deserialize)]
struct BodyShape {
    #[serde(default)]
    comments: Option<IgnoredAny>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

/// Reads an optional comment from a create response; blank or unrecognised
/// bodies mean the backend did not echo the comment.
pub(crate) fn parse_created_comment(body: &str) -> Option<Comment> {
    if body.trim().is_empty() {
        return None;
    }
    match from_json_unbounded::<CommentEnvelope>(body) {
        Ok(CommentEnvelope::Wrapped { comment }) => Some(comment),
        Ok(CommentEnvelope::Bare(comment)) => match from_json_unbounded::<BodyShape>(body) {
            Ok(BodyShape { comments: None }) => Some(comment),
            _ => {
                debug!(id = %comment.id, "create-comment response is not a comment");
                None
            }
        },
        Err(e) => {
            debug!(error = %e, "create-comment response carries no comment");
            None
        }
    }
}

#[async_trait]
impl ForumApi for HttpForumApi {
    async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
        debug!(url = %self.client.url(POSTS_PATH), "listing posts");
        let resp = self.client.send(self.client.get(POSTS_PATH)).await?;
        let body = resp.text().await.map_err(ApiError::from)?;
        let posts = parse_post_list(&body)
            .map_err(|e| ApiError::Decode(format!("post list: {e}")))?;
        Ok(posts)
    }

    async fn create_post(&self, draft: &PostDraft) -> anyhow::Result<Post> {
        let content = draft.trimmed_content();
        let request = self.client.post(POSTS_PATH);
        let request = match &draft.attachment {
            Attachment::Pending(image) => {
                let part = Part::bytes(image.bytes.to_vec())
                    .file_name(image.file_name.clone())
                    .mime_str(image.content_type.as_ref())
                    .map_err(ApiError::from)?;
                request.multipart(
                    Form::new()
                        .text("content", content.to_string())
                        .part("image", part),
                )
            }
            attachment => request.json(&PostBody {
                content,
                image_url: attachment.uploaded_url(),
            }),
        };

        let resp = self.client.send(request).await?;
        let post = match ApiClient::parse::<PostEnvelope>(resp).await? {
            PostEnvelope::Bare(post) | PostEnvelope::Wrapped { post } => post,
        };
        Ok(post)
    }

    async fn create_comment(
        &self,
        post_id: &PostId,
        comment: &NewComment,
    ) -> anyhow::Result<Option<Comment>> {
        let request = self.client.post_to(self.comments_url(post_id)?).json(comment);
        let resp = self.client.send(request).await?;
        let body = resp.text().await.map_err(ApiError::from)?;
        Ok(parse_created_comment(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_create_response_has_no_comment() {
        assert!(parse_created_comment("").is_none());
        assert!(parse_created_comment(r#"{"message":"Comment added"}"#).is_none());
    }

    #[test]
    fn test_wrapped_create_response_is_read() {
        let body = r#"{"comment":{"_id":"c9","author":{"_id":"u1","name":"Alice","role":"user"},
            "content":"hi","createdAt":"2026-10-16T08:00:00Z"}}"#;
        let comment = parse_created_comment(body).unwrap();
        assert_eq!(comment.id.as_str(), "c9");
        assert!(comment.replies.is_empty());
    }

    #[test]
    fn test_post_shaped_response_is_not_a_comment() {
        let body = r#"{"_id":"p1","author":{"_id":"u1","name":"Alice","role":"user"},
            "content":"hi","comments":[],"createdAt":"2026-10-16T08:00:00Z"}"#;
        assert!(parse_created_comment(body).is_none());
    }

    #[test]
    fn test_comments_url_escapes_post_id() {
        let api = HttpForumApi::new(ApiClient::new(
            "http://localhost:5000/api",
            std::sync::Arc::new(crate::client::NoAuth),
        ));
        assert_eq!(
            api.comments_url(&PostId::new("p1")).unwrap().as_str(),
            "http://localhost:5000/api/community/posts/p1/comments"
        );
        assert_eq!(
            api.comments_url(&PostId::new("a/b c")).unwrap().as_str(),
            "http://localhost:5000/api/community/posts/a%2Fb%20c/comments"
        );
    }

    #[test]
    fn test_post_list_accepts_both_shapes() {
        assert!(parse_post_list("[]").unwrap().is_empty());
        assert!(parse_post_list(r#" {"posts": []}"#).unwrap().is_empty());
    }
}
