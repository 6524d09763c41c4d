//! Plain-text rendering of threads and user-facing error notices.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use eh_core::{format_author_label, format_timestamp, Actor, ForumError, Thread, ThreadStore};

const INDENT: &str = "    ";

fn byline(author: &Actor, at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!(
        "{} ({}) · {}",
        format_author_label(author),
        author.role.title(),
        format_timestamp(at, now)
    )
}

pub fn render_thread(thread: &Thread, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", thread.id(), byline(thread.author(), thread.created_at(), now));
    for line in thread.content().lines() {
        let _ = writeln!(out, "{line}");
    }
    if let Some(url) = thread.image_url() {
        let _ = writeln!(out, "[image] {url}");
    }

    for row in thread.flatten() {
        let pad = INDENT.repeat(row.depth + 1);
        let comment = row.comment;
        let _ = writeln!(
            out,
            "{pad}[{}] {}",
            comment.id,
            byline(&comment.author, comment.created_at, now)
        );
        for line in comment.content.lines() {
            let _ = writeln!(out, "{pad}{line}");
        }
    }
    out
}

pub fn render_forum(store: &ThreadStore, now: DateTime<Utc>) -> String {
    if store.is_empty() {
        return "No posts yet. Be the first to post!\n".to_string();
    }
    store
        .posts()
        .map(|thread| render_thread(thread, now))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What to tell the user for each kind of failure.
pub fn explain(err: &ForumError) -> String {
    match err {
        ForumError::Validation(msg) => format!("Nothing sent: {msg}."),
        ForumError::NotFound { .. } => {
            "Could not find the item you replied to. Refresh with `threads` and try again.".into()
        }
        ForumError::AuthRequired => {
            "Please sign in first (set EQUIHEALTH__API__TOKEN or api.token).".into()
        }
        ForumError::RemoteSync(msg) => format!("The forum could not be reached ({msg}). Try again."),
        ForumError::Conflict(msg) => format!("Please wait: {msg}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eh_core::{Comment, CommentId, Post, PostId, Role};

    #[test]
    fn test_renders_replies_indented_by_depth() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let smith = Actor::new("d1", "Dr. Smith", Role::Doctor).with_specialization("Psychiatry");
        let bob = Actor::new("u2", "Bob", Role::Patient);
        let reply = Comment {
            id: CommentId::new("r1"),
            author: bob.clone(),
            content: "Thanks!".into(),
            created_at: now - chrono::Duration::minutes(5),
            replies: vec![],
        };
        let post = Post {
            id: PostId::new("p1"),
            author: bob,
            content: "Stress tips?".into(),
            image_url: None,
            comments: vec![Comment {
                id: CommentId::new("c1"),
                author: smith,
                content: "Exercise.".into(),
                created_at: now - chrono::Duration::minutes(30),
                replies: vec![reply],
            }],
            created_at: now - chrono::Duration::hours(2),
        };
        let store = ThreadStore::from_posts(vec![post]).unwrap();

        let text = render_forum(&store, now);
        let expected = "\
[p1] Bob (Patient) · 2 hours ago
Stress tips?
    [c1] Dr. Smith (Psychiatry) (Doctor) · 30 minutes ago
    Exercise.
        [r1] Bob (Patient) · 5 minutes ago
        Thanks!
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_forum_has_a_hint() {
        assert!(render_forum(&ThreadStore::new(), Utc::now()).starts_with("No posts yet"));
    }
}
