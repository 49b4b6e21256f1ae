//! Name autocomplete for the management `edit` and `delete` subcommands.

use std::sync::Arc;

use tracing::warn;

use makro_core::{
    Choice, Interaction, InteractionResponse, MANAGEMENT_COMMAND, MakroResult, normalize,
};

use crate::AppState;

/// Platform cap on autocomplete choices.
const MAX_CHOICES: usize = 25;
/// Platform cap on a choice label.
const MAX_LABEL_LEN: usize = 100;

pub async fn handle(
    state: &Arc<AppState>,
    interaction: Interaction,
) -> MakroResult<InteractionResponse> {
    let Some(guild_id) = interaction.guild_id.as_deref() else {
        return Ok(InteractionResponse::autocomplete(Vec::new()));
    };
    if interaction.command_name() != Some(MANAGEMENT_COMMAND) {
        return Ok(InteractionResponse::autocomplete(Vec::new()));
    }
    let completes_names = interaction
        .subcommand()
        .is_some_and(|sub| sub.name == "edit" || sub.name == "delete");
    if !completes_names {
        return Ok(InteractionResponse::autocomplete(Vec::new()));
    }

    // Partial input goes through the same slug normalization as stored
    // names, so "Greet Bot" finds "greet-bot".
    let query = normalize(interaction.focused_value().unwrap_or_default());

    // A failed lookup degrades to an empty list rather than an error reply.
    let commands = match state.store.list_commands(guild_id).await {
        Ok(commands) => commands,
        Err(err) => {
            warn!(guild_id, error = %err, "autocomplete lookup failed");
            return Ok(InteractionResponse::autocomplete(Vec::new()));
        }
    };

    let choices = commands
        .into_iter()
        .filter(|command| query.is_empty() || command.name.contains(&query))
        .take(MAX_CHOICES)
        .map(|command| Choice { name: label(&command.name, &command.description), value: command.name })
        .collect();
    Ok(InteractionResponse::autocomplete(choices))
}

fn label(name: &str, description: &str) -> String {
    let full = if description.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {description}")
    };
    full.chars().take(MAX_LABEL_LEN).collect()
}
