//! Outbound interaction responses.
//!
//! Builders for the five response shapes the webhook returns: pong, channel
//! message, deferred channel message, autocomplete result and modal. The
//! management modal layout lives here too so the slash handler and the
//! modal-submit handler agree on field custom_ids.

use serde::Serialize;

use crate::name::MANAGEMENT_COMMAND;

/// Response `type` discriminants.
pub mod response_type {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE: u8 = 4;
    pub const DEFERRED_CHANNEL_MESSAGE: u8 = 5;
    pub const AUTOCOMPLETE_RESULT: u8 = 8;
    pub const MODAL: u8 = 9;
}

/// Message flag marking a reply as visible to the invoker only.
pub const EPHEMERAL: u64 = 64;

/// Hard cap the platform enforces on message content.
pub const MAX_CONTENT_LEN: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

/// Prefill for the edit modal, mirroring the stored command.
#[derive(Debug, Clone)]
pub struct ModalPrefill {
    pub name: String,
    pub reply: String,
    pub description: String,
    pub ephemeral: bool,
    pub allowed_roles: Vec<String>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: response_type::PONG, data: None }
    }

    /// Immediate channel message, truncated to the platform cap.
    pub fn message(content: impl Into<String>, ephemeral: bool) -> Self {
        let content: String = content.into().chars().take(MAX_CONTENT_LEN).collect();
        let mut data = serde_json::json!({ "content": content });
        if ephemeral {
            data["flags"] = serde_json::json!(EPHEMERAL);
        }
        Self { kind: response_type::CHANNEL_MESSAGE, data: Some(data) }
    }

    /// Placeholder ack for work completed out-of-band via the interaction
    /// token.
    pub fn deferred(ephemeral: bool) -> Self {
        let data = if ephemeral {
            Some(serde_json::json!({ "flags": EPHEMERAL }))
        } else {
            None
        };
        Self { kind: response_type::DEFERRED_CHANNEL_MESSAGE, data }
    }

    pub fn autocomplete(choices: Vec<Choice>) -> Self {
        Self {
            kind: response_type::AUTOCOMPLETE_RESULT,
            data: Some(serde_json::json!({
                "choices": serde_json::to_value(choices).unwrap_or_default(),
            })),
        }
    }

    /// The add/edit modal. With a prefill this becomes the edit form keyed to
    /// the command's current name, otherwise the blank add form.
    pub fn management_modal(prefill: Option<&ModalPrefill>) -> Self {
        let custom_id = match prefill {
            Some(command) => format!("{MANAGEMENT_COMMAND}:edit:{}", command.name),
            None => format!("{MANAGEMENT_COMMAND}:add"),
        };
        let title = if prefill.is_some() { "Edit command" } else { "Add command" };

        let text_input = |id: &str, label: &str, style: u8, max: u32, required: bool, value: Option<&str>| {
            serde_json::json!({
                "type": 1,
                "components": [{
                    "type": 4,
                    "custom_id": id,
                    "label": label,
                    "style": style,
                    "min_length": 1,
                    "max_length": max,
                    "required": required,
                    "value": value,
                }],
            })
        };

        let ephemeral = prefill.is_some_and(|command| command.ephemeral);
        let visibility_row = serde_json::json!({
            "type": 18,
            "label": "Visibility",
            "component": {
                "type": 3,
                "custom_id": "visibility_select",
                "placeholder": "Reply visibility",
                "min_values": 1,
                "max_values": 1,
                "required": true,
                "options": [
                    {
                        "label": "Public",
                        "value": "public",
                        "description": "Visible to everyone",
                        "default": !ephemeral,
                    },
                    {
                        "label": "Ephemeral",
                        "value": "ephemeral",
                        "description": "Visible only to the invoker",
                        "default": ephemeral,
                    },
                ],
            },
        });

        let default_roles: Vec<serde_json::Value> = prefill
            .map(|command| {
                command
                    .allowed_roles
                    .iter()
                    .map(|id| serde_json::json!({ "id": id, "type": "role" }))
                    .collect()
            })
            .unwrap_or_default();
        let roles_row = serde_json::json!({
            "type": 18,
            "label": "Allowed roles",
            "description": "Leave empty to let everyone use the command",
            "component": {
                "type": 6,
                "custom_id": "allowed_roles",
                "min_values": 0,
                "max_values": 25,
                "required": false,
                "default_values": default_roles,
            },
        });

        let components = vec![
            text_input("name", "Command name", 1, 32, true, prefill.map(|c| c.name.as_str())),
            text_input("reply", "Reply", 2, 2000, true, prefill.map(|c| c.reply.as_str())),
            text_input(
                "description",
                "Description",
                1,
                100,
                false,
                prefill.map(|c| c.description.as_str()),
            ),
            visibility_row,
            roles_row,
        ];

        Self {
            kind: response_type::MODAL,
            data: Some(serde_json::json!({
                "custom_id": custom_id,
                "title": title,
                "components": components,
            })),
        }
    }
}
