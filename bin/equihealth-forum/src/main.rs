//! # equihealth-forum
//!
//! Command-line client for the Equihealth community forum and health assistant.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use configs::{AppConfig, ChatConfig, LogConfig};
use eh_core::{
    ChatHistory, CommentId, ForumError, IdentityProvider, LocalImage, PostDraft, PostId,
};
use eh_http::{
    ApiClient, HttpAssistantApi, HttpForumApi, NoAuth, RemoteIdentity, StaticToken, TokenSource,
};
use eh_session::SessionIdentity;
use eh_sync::{AssistantSession, ForumService, SyncOptions, SyncOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Equihealth community forum client.
#[derive(Parser, Debug)]
#[command(name = "equihealth-forum", about = "Equihealth community forum client")]
struct Cli {
    /// Path to a config file (default: ./equihealth.toml when present).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the forum and print every thread.
    Threads,

    /// Publish a new post.
    Post {
        #[arg(long, default_value = "")]
        content: String,
        /// Image file to attach.
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Comment on a post, or reply to one of its comments.
    Reply {
        #[arg(long)]
        post: String,
        /// Comment to reply to; omit for a top-level comment.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        content: String,
    },

    /// Ask the health assistant a question.
    Ask {
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log);

    if let Err(err) = run(cli.command, &config).await {
        if let Some(forum_err) = err.downcast_ref::<ForumError>() {
            eprintln!("{}", render::explain(forum_err));
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn run(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    // 1. Backend connection
    let tokens: Arc<dyn TokenSource> = match &config.api.token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(NoAuth),
    };
    let client = ApiClient::with_timeout(&config.api.base_url, tokens, config.api.timeout())?;

    // 2. Identity: without a token nobody is signed in
    let identity: Arc<dyn IdentityProvider> = if config.api.token.is_some() {
        Arc::new(RemoteIdentity::new(client.clone()))
    } else {
        Arc::new(SessionIdentity::new())
    };

    // 3. Forum service
    let forum = ForumService::new(Arc::new(HttpForumApi::new(client.clone())), identity)
        .with_options(SyncOptions {
            refresh_after_write: config.sync.refresh_after_write,
        });

    match command {
        Commands::Threads => {
            forum.refresh().await?;
            let store = forum.store().await;
            print!("{}", render::render_forum(&store, chrono::Utc::now()));
        }
        Commands::Post { content, image } => {
            let mut draft = PostDraft::new(content);
            if let Some(path) = image {
                draft.attach(read_image(&path).await?);
            }
            match forum.create_post(draft).await? {
                SyncOutcome::Posted(id) => println!("Posted {id}"),
                _ => println!("Post sent; run `threads` to see it."),
            }
        }
        Commands::Reply {
            post,
            parent,
            content,
        } => {
            forum.refresh().await?;
            let post_id = PostId::new(post);
            let parent = parent.map(CommentId::new);
            match forum.add_comment(&post_id, &content, parent.as_ref()).await? {
                SyncOutcome::Discarded => println!("Reply sent; the thread has since changed."),
                SyncOutcome::Committed => println!("Reply sent; run `threads` to see it."),
                _ => {
                    let store = forum.store().await;
                    if let Some(thread) = store.get(&post_id) {
                        print!("{}", render::render_thread(thread, chrono::Utc::now()));
                    }
                }
            }
        }
        Commands::Ask { message } => {
            let session = AssistantSession::new(
                Arc::new(HttpAssistantApi::new(client)),
                load_history(&config.chat).await,
            );
            let reply = session.send(&message).await?;
            println!("{reply}");
            save_history(&config.chat, &session.history().await).await?;
        }
    }
    Ok(())
}

async fn read_image(path: &Path) -> anyhow::Result<LocalImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(LocalImage {
        file_name,
        content_type: mime_guess::from_path(path).first_or_octet_stream(),
        bytes: Bytes::from(bytes),
    })
}

async fn load_history(chat: &ChatConfig) -> ChatHistory {
    let Some(path) = &chat.history_path else {
        return ChatHistory::new(chat.history_capacity);
    };
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => ChatHistory::from_json(chat.history_capacity, &raw),
        Err(_) => ChatHistory::new(chat.history_capacity),
    }
}

async fn save_history(chat: &ChatConfig, history: &ChatHistory) -> anyhow::Result<()> {
    let Some(path) = &chat.history_path else {
        return Ok(());
    };
    tokio::fs::write(path, history.to_json()?)
        .await
        .with_context(|| format!("saving chat history to {}", path.display()))?;
    info!(messages = history.len(), "chat history saved");
    Ok(())
}
