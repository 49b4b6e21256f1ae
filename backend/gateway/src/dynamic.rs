//! Dispatch of user-created commands.
//!
//! Any chat-input command that is not the reserved management command is
//! looked up in the guild's store, gated on its role restriction, rendered
//! through the template engine and answered immediately.

use std::sync::Arc;

use tracing::{debug, warn};

use makro_core::i18n::{self, Locale, Msg};
use makro_core::{
    Interaction, InteractionResponse, MakroError, MakroResult, PolicyKind, ValidationKind,
};
use makro_template::RenderContext;

use crate::AppState;

pub async fn handle(
    state: &Arc<AppState>,
    interaction: Interaction,
) -> MakroResult<InteractionResponse> {
    let locale = Locale::resolve(interaction.locale_tag());
    let Some(guild_id) = interaction.guild_id.as_deref() else {
        return Err(MakroError::Validation(ValidationKind::GuildOnly));
    };
    let Some(name) = interaction.command_name() else {
        return Ok(InteractionResponse::message(i18n::t(locale, Msg::UnknownCommand), true));
    };

    let Some(command) = state.store.get_command(guild_id, name).await? else {
        debug!(guild_id, name, "dynamic command not in store");
        return Ok(InteractionResponse::message(i18n::t(locale, Msg::UnknownCommand), true));
    };

    if !command.allowed_roles.is_empty() {
        let member_roles = interaction
            .member
            .as_ref()
            .map(|member| member.roles.as_slice())
            .unwrap_or_default();
        let permitted = member_roles
            .iter()
            .any(|role| command.allowed_roles.contains(role));
        if !permitted {
            return Err(MakroError::Policy(PolicyKind::RoleDenied));
        }
    }

    let ctx = render_context(&interaction, &command.name);
    let rendered = makro_template::render(&command.reply, &ctx);

    if let Err(err) = state.store.increment_uses(&command.id).await {
        warn!(command_id = %command.id, error = %err, "failed to bump usage counter");
    }

    Ok(InteractionResponse::message(rendered, command.ephemeral))
}

fn render_context(interaction: &Interaction, command_name: &str) -> RenderContext {
    let invoker = interaction.invoker();
    let nick = interaction.member.as_ref().and_then(|member| member.nick.clone());
    RenderContext {
        user_id: invoker.map(|user| user.id.clone()).unwrap_or_default(),
        username: invoker.map(|user| user.username.clone()).unwrap_or_default(),
        display_name: nick.or_else(|| invoker.and_then(|user| user.global_name.clone())),
        avatar_hash: invoker.and_then(|user| user.avatar.clone()),
        channel_id: interaction.channel_id.clone(),
        guild_id: interaction.guild_id.clone(),
        locale: interaction.locale_tag().unwrap_or("en-US").to_string(),
        command_name: command_name.to_string(),
    }
}
