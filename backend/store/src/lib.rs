//! Persisted state: per-guild policy (ban flag, command quota) and the
//! per-guild custom command records, keyed by `(guild_id, name)`.

mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::MakroStore;

/// Upper bound on role restrictions per command.
pub const MAX_ALLOWED_ROLES: usize = 25;

/// Guild policy row, created lazily on first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPolicy {
    pub banned: bool,
    pub max_commands: u32,
}

/// A stored custom command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Opaque local id, also used as the analytics/uses key.
    pub id: String,
    pub name: String,
    pub reply: String,
    pub description: String,
    pub ephemeral: bool,
    pub uses: u64,
    /// Empty means unrestricted.
    pub allowed_roles: Vec<String>,
}

/// Fields written by an add or edit.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub id: String,
    pub name: String,
    pub reply: String,
    pub description: String,
    pub ephemeral: bool,
    pub allowed_roles: Vec<String>,
}

/// Dedup and cap a role list the way it is persisted.
pub(crate) fn normalize_roles(roles: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    roles
        .iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .filter(|role| seen.insert(role.clone()))
        .take(MAX_ALLOWED_ROLES)
        .collect()
}
