//! Definition of the reserved management command.

use makro_core::MANAGEMENT_COMMAND;

/// Description used when a command author leaves theirs empty.
pub const DEFAULT_DESCRIPTION: &str = "A custom command.";

/// Option type discriminants used in the definition below.
const SUB_COMMAND: u8 = 1;
const STRING: u8 = 3;

/// JSON body of the global `/makro` registration: the four management
/// subcommands, with name autocomplete on `edit` and `delete`.
pub fn base_command() -> serde_json::Value {
    let name_option = serde_json::json!({
        "type": STRING,
        "name": "name",
        "description": "Command name",
        "required": true,
        "autocomplete": true,
    });

    serde_json::json!({
        "name": MANAGEMENT_COMMAND,
        "description": "Manage custom slash commands",
        // Manage Server
        "default_member_permissions": "32",
        "dm_permission": false,
        "options": [
            { "type": SUB_COMMAND, "name": "add", "description": "Create a custom command" },
            {
                "type": SUB_COMMAND,
                "name": "edit",
                "description": "Edit a custom command",
                "options": [name_option],
            },
            { "type": SUB_COMMAND, "name": "list", "description": "List custom commands" },
            {
                "type": SUB_COMMAND,
                "name": "delete",
                "description": "Delete a custom command",
                "options": [name_option],
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_command_exposes_all_subcommands() {
        let body = base_command();
        assert_eq!(body["name"], serde_json::json!(MANAGEMENT_COMMAND));
        let names: Vec<&str> = body["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|opt| opt["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["add", "edit", "list", "delete"]);
    }

    #[test]
    fn edit_and_delete_autocomplete_on_name() {
        let body = base_command();
        for idx in [1, 3] {
            let option = &body["options"][idx]["options"][0];
            assert_eq!(option["autocomplete"], serde_json::json!(true));
        }
    }
}
