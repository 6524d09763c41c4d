//! # integration-tests
//!
//! An in-process stand-in for the portal backend, served with axum on an
//! ephemeral port so the real HTTP adapters can be driven end to end.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use eh_core::{Actor, ChatMessage, Comment, CommentId, NewComment, Post, PostId, Role};
use serde_json::{json, Value};

pub const GOOD_TOKEN: &str = "good-token";

/// An image part received by the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub posts: Vec<Post>,
    pub next_id: u64,
    /// Answer comment creation with the created comment instead of an empty body.
    pub echo_comments: bool,
    /// Fail the next request with a 500.
    pub fail_next: bool,
    pub uploads: Vec<Upload>,
    pub authorizations: Vec<Option<String>>,
    pub chat_requests: Vec<Vec<ChatMessage>>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

pub fn member() -> Actor {
    Actor::new("u1", "Alice", Role::Patient)
}

pub fn doctor() -> Actor {
    Actor::new("d1", "Smith", Role::Doctor).with_specialization("Psychiatry")
}

pub fn seed_post(id: &str, author: Actor, content: &str, comments: Vec<Comment>) -> Post {
    Post {
        id: PostId::new(id),
        author,
        content: content.into(),
        image_url: None,
        comments,
        created_at: Utc::now(),
    }
}

pub fn seed_comment(id: &str, author: Actor, content: &str, replies: Vec<Comment>) -> Comment {
    Comment {
        id: CommentId::new(id),
        author,
        content: content.into(),
        created_at: Utc::now(),
        replies,
    }
}

impl FakeBackend {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let backend = Self::default();
        backend.state().posts = posts;
        backend
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    /// Serves the backend and returns its API base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/community/posts", get(list_posts).post(create_post))
            .route("/api/community/posts/{id}/comments", post(create_comment))
            .route("/api/user/me", get(me))
            .route("/api/user/chat-support", post(chat))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    // Records the caller's token; answers 500 once if asked to.
    fn admit(&self, headers: &HeaderMap) -> Result<MutexGuard<'_, BackendState>, StatusCode> {
        let mut state = self.state();
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.authorizations.push(auth);
        if std::mem::take(&mut state.fail_next) {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(state)
    }
}

fn next_id(state: &mut BackendState, prefix: &str) -> String {
    state.next_id += 1;
    format!("{prefix}{}", state.next_id)
}

// Hands the reply back when `parent` is not in the tree.
fn attach_reply(comments: &mut [Comment], parent: &CommentId, reply: Comment) -> Result<(), Comment> {
    let mut reply = reply;
    for comment in comments.iter_mut() {
        if &comment.id == parent {
            comment.replies.push(reply);
            return Ok(());
        }
        match attach_reply(&mut comment.replies, parent, reply) {
            Ok(()) => return Ok(()),
            Err(back) => reply = back,
        }
    }
    Err(reply)
}

async fn list_posts(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    match backend.admit(&headers) {
        Ok(state) => Json(json!({ "posts": state.posts })).into_response(),
        Err(status) => status.into_response(),
    }
}

async fn create_post(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    if let Err(status) = backend.admit(&headers) {
        return status.into_response();
    }

    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let mut content = String::new();
    let mut image_url = None;
    if is_multipart {
        let Ok(mut form) = Multipart::from_request(request, &()).await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        while let Ok(Some(field)) = form.next_field().await {
            match field.name().map(str::to_string).as_deref() {
                Some("content") => content = field.text().await.unwrap_or_default(),
                Some("image") => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
                    image_url = Some(format!(
                        "https://cdn.test/{}",
                        file_name.clone().unwrap_or_default()
                    ));
                    backend.state().uploads.push(Upload {
                        file_name,
                        content_type,
                        len,
                    });
                }
                _ => {}
            }
        }
    } else {
        let Ok(Json(body)) = Json::<Value>::from_request(request, &()).await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        content = body["content"].as_str().unwrap_or_default().to_string();
        image_url = body["imageUrl"].as_str().map(str::to_string);
    }

    let mut state = backend.state();
    let id = next_id(&mut state, "p");
    let post = Post {
        id: PostId::new(id),
        author: member(),
        content,
        image_url,
        comments: Vec::new(),
        created_at: Utc::now(),
    };
    state.posts.insert(0, post.clone());
    (StatusCode::CREATED, Json(post)).into_response()
}

async fn create_comment(
    State(backend): State<FakeBackend>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<NewComment>,
) -> Response {
    let mut state = match backend.admit(&headers) {
        Ok(state) => state,
        Err(status) => return status.into_response(),
    };
    let id = next_id(&mut state, "c");
    let echo = state.echo_comments;
    let Some(target) = state.posts.iter_mut().find(|p| p.id.as_str() == post_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let comment = seed_comment(&id, member(), &body.content, Vec::new());
    match &body.parent_comment_id {
        None => target.comments.push(comment.clone()),
        Some(parent) => {
            if attach_reply(&mut target.comments, parent, comment.clone()).is_err() {
                return StatusCode::NOT_FOUND.into_response();
            }
        }
    }

    if echo {
        (StatusCode::CREATED, Json(comment)).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn me(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if let Err(status) = backend.admit(&headers) {
        return status.into_response();
    }
    let expected = format!("Bearer {GOOD_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({ "user": {
        "_id": "u1", "name": "Alice", "email": "alice@example.test", "role": "user"
    }}))
    .into_response()
}

async fn chat(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = match backend.admit(&headers) {
        Ok(state) => state,
        Err(status) => return status.into_response(),
    };
    let messages: Vec<ChatMessage> =
        serde_json::from_value(body["messages"].clone()).unwrap_or_default();
    let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
    state.chat_requests.push(messages);
    Json(json!({ "reply": format!("You said: {last}") })).into_response()
}
