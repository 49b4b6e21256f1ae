//! Remote command registry client.
//!
//! Talks to the platform's REST API to mirror local command state into its
//! registry: per-guild create/patch/delete/list, the global management
//! command, the bulk overwrite used by the admin reset, and the
//! "edit original response" call that completes deferred interactions.

mod base;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub use base::{DEFAULT_DESCRIPTION, base_command};

use makro_core::MANAGEMENT_COMMAND;

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Error)]
pub enum RegistryError {
    /// 403/404 from a guild route: the application was removed or never
    /// added there.
    #[error("missing access to guild {0}")]
    MissingAccess(String),

    #[error("registry returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A command as the remote registry reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCommand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<u8>,
}

impl RemoteCommand {
    /// Whether this entry is a user-created chat-input command this service
    /// manages (the reserved command is excluded).
    pub fn is_custom_chat_input(&self) -> bool {
        self.name != MANAGEMENT_COMMAND && self.kind.unwrap_or(1) == 1
    }
}

/// The registry operations the gateway depends on. A trait seam so handlers
/// can be exercised against a recording stub.
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    async fn list(&self, guild_id: &str) -> RegistryResult<Vec<RemoteCommand>>;

    /// Register a guild command, patching in place when the name already
    /// exists remotely.
    async fn register(&self, guild_id: &str, name: &str, description: &str) -> RegistryResult<()>;

    /// Delete a guild command by name. Unknown names are a no-op.
    async fn delete(&self, guild_id: &str, name: &str) -> RegistryResult<()>;

    /// Globally (re-)register the management command.
    async fn register_base(&self) -> RegistryResult<()>;

    /// Replace a guild's full command set.
    async fn overwrite(&self, guild_id: &str, commands: &[serde_json::Value]) -> RegistryResult<()>;

    /// Complete a deferred interaction by editing its original response.
    async fn edit_original(&self, token: &str, content: &str) -> RegistryResult<()>;
}

/// HTTP implementation of [`CommandRegistry`].
pub struct RegistryClient {
    http: reqwest::Client,
    api_base: String,
    app_id: String,
    bot_token: String,
}

impl RegistryClient {
    pub fn new(app_id: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            app_id: app_id.into(),
            bot_token: bot_token.into(),
        }
    }

    /// Point the client at a different API base (tests, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn guild_commands_url(&self, guild_id: &str) -> String {
        format!("{}/applications/{}/guilds/{guild_id}/commands", self.api_base, self.app_id)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn check(response: reqwest::Response, guild_id: Option<&str>) -> RegistryResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if let Some(guild_id) = guild_id {
            if status.as_u16() == 403 || status.as_u16() == 404 {
                return Err(RegistryError::MissingAccess(guild_id.to_string()));
            }
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Status { status: status.as_u16(), body })
    }
}

#[async_trait]
impl CommandRegistry for RegistryClient {
    async fn list(&self, guild_id: &str) -> RegistryResult<Vec<RemoteCommand>> {
        let response = self
            .http
            .get(self.guild_commands_url(guild_id))
            .header("Authorization", self.auth())
            .send()
            .await?;
        let response = Self::check(response, Some(guild_id)).await?;
        Ok(response.json().await?)
    }

    async fn register(&self, guild_id: &str, name: &str, description: &str) -> RegistryResult<()> {
        let description = if description.is_empty() { DEFAULT_DESCRIPTION } else { description };
        let payload = serde_json::json!({ "name": name, "description": description, "type": 1 });

        let existing = self.list(guild_id).await?;
        let response = match existing.iter().find(|command| command.name == name) {
            Some(remote) => {
                debug!(guild_id, name, remote_id = %remote.id, "patching registry command");
                self.http
                    .patch(format!("{}/{}", self.guild_commands_url(guild_id), remote.id))
                    .header("Authorization", self.auth())
                    .json(&payload)
                    .send()
                    .await?
            }
            None => {
                debug!(guild_id, name, "registering new registry command");
                self.http
                    .post(self.guild_commands_url(guild_id))
                    .header("Authorization", self.auth())
                    .json(&payload)
                    .send()
                    .await?
            }
        };
        Self::check(response, Some(guild_id)).await?;
        Ok(())
    }

    async fn delete(&self, guild_id: &str, name: &str) -> RegistryResult<()> {
        let existing = self.list(guild_id).await?;
        let Some(remote) = existing.iter().find(|command| command.name == name) else {
            return Ok(());
        };
        let response = self
            .http
            .delete(format!("{}/{}", self.guild_commands_url(guild_id), remote.id))
            .header("Authorization", self.auth())
            .send()
            .await?;
        Self::check(response, Some(guild_id)).await?;
        Ok(())
    }

    async fn register_base(&self) -> RegistryResult<()> {
        let url = format!("{}/applications/{}/commands", self.api_base, self.app_id);
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth())
            .json(&serde_json::json!([base_command()]))
            .send()
            .await?;
        Self::check(response, None).await?;
        Ok(())
    }

    async fn overwrite(&self, guild_id: &str, commands: &[serde_json::Value]) -> RegistryResult<()> {
        let response = self
            .http
            .put(self.guild_commands_url(guild_id))
            .header("Authorization", self.auth())
            .json(&commands)
            .send()
            .await?;
        Self::check(response, Some(guild_id)).await?;
        Ok(())
    }

    async fn edit_original(&self, token: &str, content: &str) -> RegistryResult<()> {
        let url = format!("{}/webhooks/{}/{token}/messages/@original", self.api_base, self.app_id);
        let response = self
            .http
            .patch(url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        Self::check(response, None).await?;
        Ok(())
    }
}
