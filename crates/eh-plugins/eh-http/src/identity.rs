//! Current actor as reported by `GET /user/me`.

use async_trait::async_trait;
use eh_core::{Actor, IdentityProvider};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::{ApiClient, ApiError};

const ME_PATH: &str = "user/me";

#[derive(Deserialize)]
struct MeResponse {
    user: Option<Actor>,
}

/// Asks the backend who the bearer token belongs to and remembers the answer
/// until [`RemoteIdentity::forget`] is called.
pub struct RemoteIdentity {
    client: ApiClient,
    cached: RwLock<Option<Actor>>,
}

impl RemoteIdentity {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            cached: RwLock::new(None),
        }
    }

    /// Drops the remembered actor, e.g. after sign-out.
    pub async fn forget(&self) {
        *self.cached.write().await = None;
    }

    async fn fetch(&self) -> Result<Option<Actor>, ApiError> {
        let resp = self.client.send(self.client.get(ME_PATH)).await?;
        let me: MeResponse = ApiClient::parse(resp).await?;
        Ok(me.user)
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentity {
    async fn current_actor(&self) -> anyhow::Result<Option<Actor>> {
        if let Some(actor) = self.cached.read().await.as_ref() {
            return Ok(Some(actor.clone()));
        }

        let mut cached = self.cached.write().await;
        if cached.is_none() {
            match self.fetch().await {
                Ok(actor) => *cached = actor,
                // An expired or missing token reads as "signed out".
                Err(ApiError::Server { status: 401, .. }) => debug!("session is not signed in"),
                Err(e) => {
                    warn!(error = %e, "failed to resolve current user");
                    return Err(e.into());
                }
            }
        }
        Ok(cached.clone())
    }
}
