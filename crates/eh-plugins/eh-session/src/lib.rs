//! # eh-session
//!
//! In-process implementation of `IdentityProvider`.
//! Holds the actor snapshot taken at sign-in until sign-out.

use async_trait::async_trait;
use eh_core::{Actor, ForumError, IdentityProvider, Result};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
pub struct SessionIdentity {
    current: RwLock<Option<Actor>>,
}

impl SessionIdentity {
    /// A session nobody is signed in to.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        Self {
            current: RwLock::new(Some(actor)),
        }
    }

    /// Replaces whoever was signed in. Blank ids or names are rejected.
    pub async fn sign_in(&self, actor: Actor) -> Result<()> {
        if actor.id.trim().is_empty() || actor.display_name.trim().is_empty() {
            return Err(ForumError::Validation(
                "actor needs an id and a display name".into(),
            ));
        }
        info!(actor = %actor.id, role = %actor.role, "signed in");
        *self.current.write().await = Some(actor);
        Ok(())
    }

    /// Returns the actor that was signed in, if any.
    pub async fn sign_out(&self) -> Option<Actor> {
        let previous = self.current.write().await.take();
        if let Some(actor) = &previous {
            info!(actor = %actor.id, "signed out");
        }
        previous
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_actor(&self) -> anyhow::Result<Option<Actor>> {
        Ok(self.current.read().await.clone())
    }
}
