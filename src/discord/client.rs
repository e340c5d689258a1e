use async_trait::async_trait;
use std::sync::Arc;
use twilight_http::Client;
use twilight_model::id::{
    marker::{ApplicationMarker, UserMarker},
    Id,
};

use crate::error::{Error, Result};

/// The Discord calls the draw flow needs, mockable in tests.
#[async_trait]
pub trait DiscordInterface: Send + Sync {
    /// Open (or reuse) the DM channel with `user_id` and post `content`.
    async fn send_direct_message(&self, user_id: Id<UserMarker>, content: &str) -> Result<()>;

    /// Replace the content of a deferred interaction response.
    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct DiscordClient {
    pub http: Arc<Client>,
    pub application_id: Id<ApplicationMarker>,
}

impl DiscordClient {
    pub fn new(token: &str, application_id: u64) -> Self {
        let http = Arc::new(Client::new(token.to_string()));
        Self {
            http,
            application_id: Id::new(application_id),
        }
    }
}

#[async_trait]
impl DiscordInterface for DiscordClient {
    async fn send_direct_message(&self, user_id: Id<UserMarker>, content: &str) -> Result<()> {
        let channel = self
            .http
            .create_private_channel(user_id)
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?
            .model()
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;

        // Fails with 50007 when the user has DMs from server members turned off
        self.http
            .create_message(channel.id)
            .content(content)
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;
        Ok(())
    }

    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<()> {
        self.http
            .interaction(self.application_id)
            .update_response(interaction_token)
            .content(Some(content))
            .await
            .map_err(|e| Error::Discord(e.to_string()))?;
        Ok(())
    }
}
