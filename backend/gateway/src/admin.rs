//! Authenticated admin surface.
//!
//! Out-of-band maintenance endpoints: re-register the global management
//! command, reset guild registries, and adjust per-guild quota and ban
//! policy. Every route is gated on a shared secret passed as a
//! bearer token, an `x-makro-secret` header or a `secret` query parameter.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, info, warn};

use makro_core::parse_loose_bool;
use makro_registry::{DEFAULT_DESCRIPTION, RegistryError};

use crate::AppState;

pub const SECRET_HEADER: &str = "x-makro-secret";

/// The shared admin secret, either configured or generated per run.
pub struct AdminAuth {
    secret: String,
}

impl AdminAuth {
    /// Use the configured secret, or mint one and log it so the operator can
    /// still reach the admin surface.
    pub fn resolve(configured: Option<String>) -> Self {
        match configured.filter(|secret| !secret.trim().is_empty()) {
            Some(secret) => Self { secret },
            None => {
                let secret = uuid::Uuid::new_v4().to_string();
                warn!("no admin secret configured, generated one for this run: {secret}");
                Self { secret }
            }
        }
    }

    pub fn authorized(&self, headers: &HeaderMap, query: &HashMap<String, String>) -> bool {
        let bearer = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if bearer == Some(self.secret.as_str()) {
            return true;
        }
        let header = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
        if header == Some(self.secret.as_str()) {
            return true;
        }
        query.get("secret").map(String::as_str) == Some(self.secret.as_str())
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// `POST /admin/register-base`: (re-)register the global management
/// command.
pub async fn register_base(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.admin.authorized(&headers, &query) {
        return unauthorized();
    }
    match state.registry.register_base().await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(err) => {
            error!(error = %err, "global command registration failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

/// `POST /admin/reset-commands`: re-register the global command and rewrite
/// the named guilds' registries, keeping only the custom chat-input entries.
/// Guilds the application no longer has access to are skipped, not failed.
pub async fn reset_commands(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if !state.admin.authorized(&headers, &query) {
        return unauthorized();
    }
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let guild_ids = guild_ids(&query, &body);

    let global = match state.registry.register_base().await {
        Ok(()) => "ok".to_string(),
        Err(err) => {
            error!(error = %err, "global command registration failed during reset");
            format!("error: {err}")
        }
    };

    let mut guilds = Vec::with_capacity(guild_ids.len());
    for guild_id in guild_ids {
        guilds.push(reset_guild(&state, &guild_id).await);
    }
    Json(json!({ "global": global, "guilds": guilds })).into_response()
}

async fn reset_guild(state: &Arc<AppState>, guild_id: &str) -> serde_json::Value {
    let remote = match state.registry.list(guild_id).await {
        Ok(remote) => remote,
        Err(RegistryError::MissingAccess(_)) => {
            info!(guild_id, "guild skipped, application has no access");
            return json!({ "id": guild_id, "status": "skipped" });
        }
        Err(err) => {
            error!(guild_id, error = %err, "reset could not list guild commands");
            return json!({ "id": guild_id, "status": "error", "error": err.to_string() });
        }
    };
    let payloads: Vec<serde_json::Value> = remote
        .iter()
        .filter(|command| command.is_custom_chat_input())
        .map(|command| {
            let description = match command.description.as_deref() {
                Some(description) if !description.is_empty() => description,
                _ => DEFAULT_DESCRIPTION,
            };
            json!({ "name": command.name, "description": description, "type": 1 })
        })
        .collect();

    match state.registry.overwrite(guild_id, &payloads).await {
        Ok(()) => {
            info!(guild_id, recreated = payloads.len(), "guild registry rebuilt");
            json!({ "id": guild_id, "status": "ok", "recreated": payloads.len() })
        }
        Err(RegistryError::MissingAccess(_)) => {
            info!(guild_id, "guild skipped, application has no access");
            json!({ "id": guild_id, "status": "skipped" })
        }
        Err(err) => {
            error!(guild_id, error = %err, "guild registry rebuild failed");
            json!({ "id": guild_id, "status": "error", "error": err.to_string() })
        }
    }
}

/// Guild ids from the `guildId`/`guild` query or body fields, comma-separated
/// or as a JSON array.
fn guild_ids(query: &HashMap<String, String>, body: &serde_json::Value) -> Vec<String> {
    let mut ids = Vec::new();
    let mut push_list = |raw: &str| {
        for id in raw.split(',') {
            let id = id.trim();
            if !id.is_empty() && !ids.contains(&id.to_string()) {
                ids.push(id.to_string());
            }
        }
    };
    for key in ["guildId", "guild"] {
        if let Some(raw) = query.get(key) {
            push_list(raw);
        }
        if let Some(raw) = body.get(key).and_then(|value| value.as_str()) {
            push_list(raw);
        }
    }
    if let Some(array) = body.get("guilds").and_then(|value| value.as_array()) {
        for entry in array {
            if let Some(id) = entry.as_str() {
                push_list(id);
            }
        }
    }
    ids
}

/// `POST /admin/guild-limit`: set a guild's command quota.
pub async fn guild_limit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if !state.admin.authorized(&headers, &query) {
        return unauthorized();
    }
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let Some(guild_id) = body.get("guildId").and_then(|value| value.as_str()) else {
        return bad_request("guildId required");
    };
    let Some(max_commands) = body.get("maxCommands").and_then(|value| value.as_u64()) else {
        return bad_request("maxCommands required");
    };
    if max_commands == 0 || max_commands > u32::MAX as u64 {
        return bad_request("maxCommands out of range");
    }
    match state.store.set_guild_limit(guild_id, max_commands as u32).await {
        Ok(()) => {
            info!(guild_id, max_commands, "guild quota updated");
            Json(json!({ "ok": true })).into_response()
        }
        Err(err) => {
            error!(guild_id, error = %err, "guild quota update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "storage" }))).into_response()
        }
    }
}

/// `POST /admin/guild-ban`: set or clear a guild's ban flag.
pub async fn guild_ban(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if !state.admin.authorized(&headers, &query) {
        return unauthorized();
    }
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let Some(guild_id) = body.get("guildId").and_then(|value| value.as_str()) else {
        return bad_request("guildId required");
    };
    let Some(banned) = body.get("banned").map(parse_loose_bool).unwrap_or(None) else {
        return bad_request("banned must be a boolean");
    };
    match state.store.set_guild_banned(guild_id, banned).await {
        Ok(()) => {
            info!(guild_id, banned, "guild ban flag updated");
            Json(json!({ "ok": true })).into_response()
        }
        Err(err) => {
            error!(guild_id, error = %err, "guild ban update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "storage" }))).into_response()
        }
    }
}
