//! Modal submit handling: the write path for add and edit.
//!
//! Validation and the store/registry writes run in the deferred task. Local
//! state is the source of truth: a create or in-place edit commits locally
//! first and reports a partial success if the registry write then fails. A
//! rename registers the new name remotely first, so a registry outage cannot
//! strand a command the platform will never route to us.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use makro_core::i18n::{self, Locale, Msg};
use makro_core::{
    Interaction, InteractionResponse, MANAGEMENT_COMMAND, MakroError, MakroResult, PolicyKind,
    ValidationKind, is_reserved, normalize, parse_visibility,
};
use makro_registry::CommandRegistry;
use makro_store::{MakroStore, NewCommand};

use crate::{AppState, defer};

const MAX_REPLY_LEN: usize = 2000;
const MAX_DESCRIPTION_LEN: usize = 100;

enum Mode {
    Add,
    Edit { original: String },
}

pub async fn handle(
    state: &Arc<AppState>,
    interaction: Interaction,
) -> MakroResult<InteractionResponse> {
    let locale = Locale::resolve(interaction.locale_tag());
    let Some(guild_id) = interaction.guild_id.clone() else {
        return Err(MakroError::Validation(ValidationKind::GuildOnly));
    };
    if !interaction.has_manage_guild() {
        return Err(MakroError::Policy(PolicyKind::ManageRequired));
    }

    let custom_id = interaction
        .data
        .as_ref()
        .and_then(|data| data.custom_id.as_deref())
        .unwrap_or_default();
    let mode = parse_custom_id(custom_id)?;

    let Some(token) = interaction.token.clone() else {
        return Err(MakroError::Internal(anyhow::anyhow!("modal submit without token")));
    };
    let fields = interaction.modal_fields();
    let submitter = interaction
        .invoker()
        .map(|user| user.username.clone())
        .unwrap_or_default();

    let store = state.store.clone();
    let registry = state.registry.clone();
    Ok(defer::respond_deferred(state, locale, token, async move {
        let submission = validate(&fields, &submitter)?;
        let policy = store.ensure_guild(&guild_id).await?;
        if policy.banned {
            return Err(MakroError::Policy(PolicyKind::Banned));
        }
        match mode {
            Mode::Add => {
                add(&store, registry.as_ref(), &guild_id, locale, policy.max_commands, submission)
                    .await
            }
            Mode::Edit { original } => {
                edit(&store, registry.as_ref(), &guild_id, locale, &original, submission).await
            }
        }
    }))
}

fn parse_custom_id(custom_id: &str) -> MakroResult<Mode> {
    let Some(rest) = custom_id.strip_prefix(&format!("{MANAGEMENT_COMMAND}:")) else {
        return Err(MakroError::Validation(ValidationKind::UnsupportedModal));
    };
    match rest.split_once(':') {
        None if rest == "add" => Ok(Mode::Add),
        Some(("edit", original)) if !original.is_empty() => {
            Ok(Mode::Edit { original: normalize(original) })
        }
        _ => Err(MakroError::Validation(ValidationKind::UnsupportedModal)),
    }
}

struct Submission {
    name: String,
    reply: String,
    description: String,
    ephemeral: bool,
    allowed_roles: Vec<String>,
}

fn validate(fields: &HashMap<String, Vec<String>>, submitter: &str) -> MakroResult<Submission> {
    let first = |id: &str| fields.get(id).and_then(|values| values.first()).map(String::as_str);

    let name = normalize(first("name").unwrap_or_default());
    if name.is_empty() {
        return Err(MakroError::Validation(ValidationKind::Name));
    }
    if is_reserved(&name) {
        return Err(MakroError::Validation(ValidationKind::ReservedName));
    }

    let reply: String = first("reply")
        .unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_REPLY_LEN)
        .collect();
    if reply.is_empty() {
        return Err(MakroError::Validation(ValidationKind::Reply));
    }

    let description = first("description").map(str::trim).unwrap_or_default();
    let description: String = if description.is_empty() {
        format!("Added by {submitter}.")
    } else {
        description.to_string()
    }
    .chars()
    .take(MAX_DESCRIPTION_LEN)
    .collect();

    let Some(ephemeral) = parse_visibility(first("visibility_select")) else {
        return Err(MakroError::Validation(ValidationKind::Visibility));
    };

    let allowed_roles = fields.get("allowed_roles").cloned().unwrap_or_default();

    Ok(Submission { name, reply, description, ephemeral, allowed_roles })
}

async fn add(
    store: &MakroStore,
    registry: &dyn CommandRegistry,
    guild_id: &str,
    locale: Locale,
    max_commands: u32,
    submission: Submission,
) -> MakroResult<String> {
    if store.get_command(guild_id, &submission.name).await?.is_some() {
        return Err(MakroError::Conflict);
    }
    if store.command_count(guild_id).await? >= max_commands {
        return Err(MakroError::Policy(PolicyKind::LimitReached(max_commands)));
    }

    let command = NewCommand {
        id: uuid::Uuid::new_v4().to_string(),
        name: submission.name,
        reply: submission.reply,
        description: submission.description,
        ephemeral: submission.ephemeral,
        allowed_roles: submission.allowed_roles,
    };
    store.upsert_command(guild_id, &command).await?;
    info!(guild_id, name = %command.name, "command created");

    if let Err(err) = registry.register(guild_id, &command.name, &command.description).await {
        warn!(guild_id, name = %command.name, error = %err, "registry register failed after save");
        return Ok(i18n::tf(locale, Msg::SavedSyncFailed, &[("reason", &err.to_string())]));
    }
    Ok(i18n::tf(locale, Msg::Added, &[("name", &command.name)]))
}

async fn edit(
    store: &MakroStore,
    registry: &dyn CommandRegistry,
    guild_id: &str,
    locale: Locale,
    original: &str,
    submission: Submission,
) -> MakroResult<String> {
    let Some(existing) = store.get_command(guild_id, original).await? else {
        return Err(MakroError::NotFound);
    };
    let renaming = submission.name != original;
    if renaming && store.get_command(guild_id, &submission.name).await?.is_some() {
        return Err(MakroError::Conflict);
    }

    let command = NewCommand {
        id: existing.id,
        name: submission.name,
        reply: submission.reply,
        description: submission.description,
        ephemeral: submission.ephemeral,
        allowed_roles: submission.allowed_roles,
    };

    if !renaming {
        store.update_command(guild_id, original, &command).await?;
        if let Err(err) = registry.register(guild_id, &command.name, &command.description).await {
            warn!(guild_id, name = %command.name, error = %err, "registry patch failed after save");
            return Ok(i18n::tf(locale, Msg::SavedSyncFailed, &[("reason", &err.to_string())]));
        }
        return Ok(i18n::tf(locale, Msg::Updated, &[("name", &command.name)]));
    }

    // Rename: the new name must exist remotely before anything local moves,
    // otherwise nothing is saved and the user is told to retry.
    if let Err(err) = registry.register(guild_id, &command.name, &command.description).await {
        warn!(guild_id, name = %command.name, error = %err, "registry register failed, rename aborted");
        return Ok(i18n::tf(locale, Msg::RenameSyncFailed, &[("reason", &err.to_string())]));
    }
    store.update_command(guild_id, original, &command).await?;
    if let Err(err) = registry.delete(guild_id, original).await {
        warn!(guild_id, name = original, error = %err, "stale registry entry left behind by rename");
    }
    info!(guild_id, from = original, to = %command.name, "command renamed");
    Ok(i18n::tf(locale, Msg::UpdatedRenamed, &[("name", &command.name), ("old", original)]))
}
