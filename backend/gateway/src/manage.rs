//! The management slash command.
//!
//! Handles the four subcommands of the reserved command: `add` and `edit`
//! open the command modal, `list` and `delete` defer and complete through the
//! interaction token.

use std::sync::Arc;

use tracing::warn;

use makro_core::i18n::{self, Locale, Msg};
use makro_core::{
    CommandOption, Interaction, InteractionResponse, MakroError, MakroResult, ModalPrefill,
    PolicyKind, ValidationKind, normalize,
};

use crate::{AppState, defer};

/// Keep listings clear of the platform's 2000-char content cap.
const LIST_CAP: usize = 1900;

pub async fn handle(
    state: &Arc<AppState>,
    interaction: Interaction,
) -> MakroResult<InteractionResponse> {
    let locale = Locale::resolve(interaction.locale_tag());
    let Some(guild_id) = interaction.guild_id.clone() else {
        return Err(MakroError::Validation(ValidationKind::GuildOnly));
    };
    if !interaction.is_chat_input() {
        return Ok(InteractionResponse::message(i18n::t(locale, Msg::ChatInputOnly), true));
    }
    if !interaction.has_manage_guild() {
        return Err(MakroError::Policy(PolicyKind::ManageRequired));
    }

    let Some(subcommand) = interaction.subcommand() else {
        return Ok(InteractionResponse::message(i18n::t(locale, Msg::UnsupportedInteraction), true));
    };

    match subcommand.name.as_str() {
        "add" => Ok(InteractionResponse::management_modal(None)),
        "edit" => {
            let name = required_name(subcommand)?;
            let Some(command) = state.store.get_command(&guild_id, &name).await? else {
                return Err(MakroError::NotFound);
            };
            let prefill = ModalPrefill {
                name: command.name,
                reply: command.reply,
                description: command.description,
                ephemeral: command.ephemeral,
                allowed_roles: command.allowed_roles,
            };
            Ok(InteractionResponse::management_modal(Some(&prefill)))
        }
        "list" => {
            let token = require_token(&interaction)?;
            let store = state.store.clone();
            Ok(defer::respond_deferred(state, locale, token, async move {
                let commands = store.list_commands(&guild_id).await?;
                if commands.is_empty() {
                    return Ok(i18n::t(locale, Msg::NoCommands).to_string());
                }
                let lines: Vec<String> = commands
                    .iter()
                    .map(|command| {
                        let mut line = format!("/{}", command.name);
                        if !command.description.is_empty() {
                            line.push_str(": ");
                            line.push_str(&command.description);
                        }
                        line.push_str(&format!(" ({} uses", command.uses));
                        if command.ephemeral {
                            line.push_str(", ephemeral");
                        }
                        line.push(')');
                        line
                    })
                    .collect();
                Ok(lines.join("\n").chars().take(LIST_CAP).collect())
            }))
        }
        "delete" => {
            let name = required_name(subcommand)?;
            let token = require_token(&interaction)?;
            let store = state.store.clone();
            let registry = state.registry.clone();
            Ok(defer::respond_deferred(state, locale, token, async move {
                let Some(removed) = store.remove_command(&guild_id, &name).await? else {
                    return Err(MakroError::NotFound);
                };
                if let Err(err) = registry.delete(&guild_id, &removed.name).await {
                    warn!(guild_id, name = %removed.name, error = %err,
                        "registry delete failed after local removal");
                }
                Ok(i18n::tf(locale, Msg::Removed, &[("name", &removed.name)]))
            }))
        }
        other => {
            warn!(subcommand = other, "unknown management subcommand");
            Ok(InteractionResponse::message(i18n::t(locale, Msg::UnsupportedInteraction), true))
        }
    }
}

/// The normalized `name` option of a subcommand.
fn required_name(subcommand: &CommandOption) -> MakroResult<String> {
    let raw = subcommand
        .options
        .iter()
        .find(|option| option.name == "name")
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    let name = normalize(raw);
    if name.is_empty() {
        return Err(MakroError::Validation(ValidationKind::Name));
    }
    Ok(name)
}

fn require_token(interaction: &Interaction) -> MakroResult<String> {
    interaction
        .token
        .clone()
        .ok_or_else(|| MakroError::Internal(anyhow::anyhow!("interaction without token")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_state, wait_for_completion};
    use makro_core::response::response_type;
    use makro_store::NewCommand;

    fn manage_interaction(sub: serde_json::Value) -> Interaction {
        serde_json::from_value(serde_json::json!({
            "type": 2,
            "token": "tok",
            "guild_id": "g1",
            "member": { "user": { "id": "u1", "username": "amy" }, "permissions": "32" },
            "data": { "name": "makro", "type": 1, "options": [sub] }
        }))
        .unwrap()
    }

    async fn seed(state: &Arc<AppState>, name: &str) {
        state
            .store
            .upsert_command(
                "g1",
                &NewCommand {
                    id: format!("id-{name}"),
                    name: name.to_string(),
                    reply: "hi".to_string(),
                    description: "greets".to_string(),
                    ephemeral: false,
                    allowed_roles: Vec::new(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_opens_the_blank_modal() {
        let (state, _) = test_state();
        let response = handle(&state, manage_interaction(serde_json::json!({ "name": "add", "type": 1 })))
            .await
            .unwrap();
        assert_eq!(response.kind, response_type::MODAL);
        assert_eq!(response.data.unwrap()["custom_id"], serde_json::json!("makro:add"));
    }

    #[tokio::test]
    async fn edit_prefills_from_the_store() {
        let (state, _) = test_state();
        seed(&state, "greet").await;
        let sub = serde_json::json!({
            "name": "edit", "type": 1,
            "options": [{ "name": "name", "type": 3, "value": "Greet" }]
        });
        let response = handle(&state, manage_interaction(sub)).await.unwrap();
        let data = response.data.unwrap();
        assert_eq!(data["custom_id"], serde_json::json!("makro:edit:greet"));
    }

    #[tokio::test]
    async fn edit_of_a_missing_command_is_not_found() {
        let (state, _) = test_state();
        let sub = serde_json::json!({
            "name": "edit", "type": 1,
            "options": [{ "name": "name", "type": 3, "value": "ghost" }]
        });
        let err = handle(&state, manage_interaction(sub)).await.unwrap_err();
        assert!(matches!(err, MakroError::NotFound));
    }

    #[tokio::test]
    async fn list_defers_and_reports_each_command() {
        let (state, registry) = test_state();
        seed(&state, "greet").await;
        let response = handle(&state, manage_interaction(serde_json::json!({ "name": "list", "type": 1 })))
            .await
            .unwrap();
        assert_eq!(response.kind, response_type::DEFERRED_CHANNEL_MESSAGE);
        let (_, content) = wait_for_completion(&registry).await;
        assert_eq!(content, "/greet: greets (0 uses)");
    }

    #[tokio::test]
    async fn list_of_an_empty_guild_says_so() {
        let (state, registry) = test_state();
        let _ = handle(&state, manage_interaction(serde_json::json!({ "name": "list", "type": 1 })))
            .await
            .unwrap();
        let (_, content) = wait_for_completion(&registry).await;
        assert_eq!(content, "No custom commands yet.");
    }

    #[tokio::test]
    async fn delete_removes_locally_then_remotely() {
        let (state, registry) = test_state();
        seed(&state, "greet").await;
        let sub = serde_json::json!({
            "name": "delete", "type": 1,
            "options": [{ "name": "name", "type": 3, "value": "greet" }]
        });
        let _ = handle(&state, manage_interaction(sub)).await.unwrap();
        let (_, content) = wait_for_completion(&registry).await;
        assert_eq!(content, "Removed /greet.");
        assert!(state.store.get_command("g1", "greet").await.unwrap().is_none());
        assert!(registry.calls.lock().await.contains(&"delete:g1:greet".to_string()));
    }

    #[tokio::test]
    async fn delete_of_a_missing_command_touches_no_registry() {
        let (state, registry) = test_state();
        let sub = serde_json::json!({
            "name": "delete", "type": 1,
            "options": [{ "name": "name", "type": 3, "value": "ghost" }]
        });
        let _ = handle(&state, manage_interaction(sub)).await.unwrap();
        let (_, content) = wait_for_completion(&registry).await;
        assert_eq!(content, "Command not found.");
        assert!(registry.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn manage_requires_the_permission_bit() {
        let (state, _) = test_state();
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "type": 2,
            "guild_id": "g1",
            "member": { "user": { "id": "u1", "username": "amy" }, "permissions": "16" },
            "data": { "name": "makro", "options": [{ "name": "add", "type": 1 }] }
        }))
        .unwrap();
        let err = handle(&state, interaction).await.unwrap_err();
        assert!(matches!(err, MakroError::Policy(PolicyKind::ManageRequired)));
    }
}
