//! Inbound interaction wire model.
//!
//! Typed serde mirror of the platform's interaction payload, covering the
//! four event shapes this service handles (ping, application command,
//! autocomplete, modal submit) plus the helpers the handlers need: subcommand
//! lookup, focused-option search, modal field collection and the permission
//! bit check.

use std::collections::HashMap;

use serde::Deserialize;

/// `Manage Server` permission bit.
const MANAGE_GUILD: u64 = 0x20;

/// Interaction `type` discriminants we route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl From<u8> for InteractionKind {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

/// Application command option `type` values we care about.
pub mod option_type {
    pub const SUB_COMMAND: u8 = 1;
}

/// Application command `type`: plain chat input.
pub const CHAT_INPUT: u8 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub raw_kind: u8,
    /// One-shot completion token for deferred responses.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub guild_locale: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Type-specific payload: command name + options for (autocomplete-)commands,
/// custom_id + component rows for modal submits.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub command_type: Option<u8>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub components: Vec<ModalRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: u8,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub focused: Option<bool>,
}

/// A modal component row: either a classic action row carrying `components`,
/// or a label wrapper carrying a single `component`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModalRow {
    #[serde(default)]
    pub components: Vec<ModalComponent>,
    #[serde(default)]
    pub component: Option<ModalComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalComponent {
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        InteractionKind::from(self.raw_kind)
    }

    /// Name of the invoked command, if any.
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.name.as_deref())
    }

    /// Whether the invoked command is a plain chat-input command.
    pub fn is_chat_input(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|data| data.command_type)
            .is_none_or(|ty| ty == CHAT_INPUT)
    }

    /// The user who triggered the interaction (guild member or DM user).
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Locale tag to localize replies with.
    pub fn locale_tag(&self) -> Option<&str> {
        self.locale.as_deref().or(self.guild_locale.as_deref())
    }

    /// First subcommand option of the invoked command.
    pub fn subcommand(&self) -> Option<&CommandOption> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|opt| opt.option_type == option_type::SUB_COMMAND)
    }

    /// Whether the invoking member may manage this guild's commands.
    pub fn has_manage_guild(&self) -> bool {
        let permissions = self
            .member
            .as_ref()
            .and_then(|member| member.permissions.as_deref());
        has_manage_guild(permissions)
    }

    /// Value of the currently focused autocomplete option, searched
    /// depth-first through nested subcommand options.
    pub fn focused_value(&self) -> Option<&str> {
        fn search(options: &[CommandOption]) -> Option<&str> {
            for option in options {
                if option.focused == Some(true) {
                    if let Some(value) = option.value.as_ref().and_then(|v| v.as_str()) {
                        return Some(value);
                    }
                }
                if let Some(found) = search(&option.options) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.data.as_ref()?.options)
    }

    /// Collect every submitted modal field, keyed by custom_id. Select
    /// components contribute their full `values` list, text inputs a single
    /// entry.
    pub fn modal_fields(&self) -> HashMap<String, Vec<String>> {
        let mut fields = HashMap::new();
        let Some(data) = self.data.as_ref() else {
            return fields;
        };
        for row in &data.components {
            for component in row.components.iter().chain(row.component.iter()) {
                let Some(id) = component.custom_id.clone() else {
                    continue;
                };
                if !component.values.is_empty() {
                    fields.insert(id, component.values.clone());
                } else if let Some(value) = component.value.clone() {
                    fields.insert(id, vec![value]);
                }
            }
        }
        fields
    }
}

/// Permission check against the serialized permission bitfield the platform
/// attaches to guild members.
pub fn has_manage_guild(permissions: Option<&str>) -> bool {
    permissions
        .and_then(|raw| raw.parse::<u64>().ok())
        .is_some_and(|bits| bits & MANAGE_GUILD == MANAGE_GUILD)
}

/// Parse a reply-visibility field. `None` input means public; unresolvable
/// values are an error, not a silent default.
pub fn parse_visibility(value: Option<&str>) -> Option<bool> {
    let Some(value) = value else {
        return Some(false);
    };
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Some(false);
    }
    match normalized.as_str() {
        "public" | "pub" => Some(false),
        "ephemeral" | "eph" | "private" | "yes" | "y" | "true" | "1" | "on" => Some(true),
        "no" | "n" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Tolerant boolean used by the admin surface (`1/0`, `true/false`,
/// `yes/no`, `on/off`, plain JSON bools and numbers).
pub fn parse_loose_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
