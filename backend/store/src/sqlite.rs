//! SQLite-backed store for guild policy and command records.
//!
//! Uses `rusqlite` behind a single async mutex. Reads always hit the
//! database; there is no in-process cache, so concurrent requests can never
//! observe stale guild or command state. The mutex also serializes writers,
//! which keeps the ban/quota check and the subsequent command write from
//! interleaving within one process.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;
use tracing::info;

use makro_core::{MakroError, MakroResult};

use crate::{CommandRecord, GuildPolicy, NewCommand, normalize_roles};

pub struct MakroStore {
    conn: Mutex<Connection>,
    default_max_commands: u32,
}

const SCHEMA: &str = "PRAGMA journal_mode=WAL;
     CREATE TABLE IF NOT EXISTS guilds (
         id           TEXT PRIMARY KEY,
         banned       INTEGER NOT NULL DEFAULT 0,
         max_commands INTEGER NOT NULL
     );
     CREATE TABLE IF NOT EXISTS commands (
         id            TEXT NOT NULL,
         guild_id      TEXT NOT NULL,
         name          TEXT NOT NULL,
         reply         TEXT NOT NULL,
         description   TEXT NOT NULL DEFAULT '',
         ephemeral     INTEGER NOT NULL DEFAULT 0,
         uses          INTEGER NOT NULL DEFAULT 0,
         allowed_roles TEXT NOT NULL DEFAULT '[]',
         UNIQUE(guild_id, name)
     );
     CREATE INDEX IF NOT EXISTS idx_commands_guild ON commands(guild_id);";

impl MakroStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>, default_max_commands: u32) -> MakroResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(MakroError::storage)?;
        conn.execute_batch(SCHEMA).map_err(MakroError::storage)?;
        info!("MakroStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn), default_max_commands })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory(default_max_commands: u32) -> MakroResult<Self> {
        let conn = Connection::open_in_memory().map_err(MakroError::storage)?;
        conn.execute_batch(SCHEMA).map_err(MakroError::storage)?;
        Ok(Self { conn: Mutex::new(conn), default_max_commands })
    }

    /// Idempotent upsert-on-read of a guild's policy row.
    pub async fn ensure_guild(&self, guild_id: &str) -> MakroResult<GuildPolicy> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO guilds (id, banned, max_commands) VALUES (?1, 0, ?2)",
            params![guild_id, self.default_max_commands],
        )
        .map_err(MakroError::storage)?;
        conn.query_row(
            "SELECT banned, max_commands FROM guilds WHERE id = ?1",
            params![guild_id],
            |row| {
                Ok(GuildPolicy {
                    banned: row.get::<_, i64>(0)? != 0,
                    max_commands: row.get::<_, u32>(1)?,
                })
            },
        )
        .map_err(MakroError::storage)
    }

    /// Admin quota upsert.
    pub async fn set_guild_limit(&self, guild_id: &str, max_commands: u32) -> MakroResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO guilds (id, banned, max_commands) VALUES (?1, 0, ?2)
             ON CONFLICT(id) DO UPDATE SET max_commands = excluded.max_commands",
            params![guild_id, max_commands],
        )
        .map_err(MakroError::storage)?;
        Ok(())
    }

    /// Admin ban upsert.
    pub async fn set_guild_banned(&self, guild_id: &str, banned: bool) -> MakroResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO guilds (id, banned, max_commands) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET banned = excluded.banned",
            params![guild_id, banned as i64, self.default_max_commands],
        )
        .map_err(MakroError::storage)?;
        Ok(())
    }

    pub async fn command_count(&self, guild_id: &str) -> MakroResult<u32> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM commands WHERE guild_id = ?1",
            params![guild_id],
            |row| row.get(0),
        )
        .map_err(MakroError::storage)
    }

    pub async fn get_command(&self, guild_id: &str, name: &str) -> MakroResult<Option<CommandRecord>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, reply, description, ephemeral, uses, allowed_roles
             FROM commands WHERE guild_id = ?1 AND name = ?2",
            params![guild_id, name],
            row_to_record,
        )
        .optional()
        .map_err(MakroError::storage)
    }

    /// All of a guild's commands, name-ordered.
    pub async fn list_commands(&self, guild_id: &str) -> MakroResult<Vec<CommandRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, reply, description, ephemeral, uses, allowed_roles
                 FROM commands WHERE guild_id = ?1 ORDER BY name",
            )
            .map_err(MakroError::storage)?;
        let rows = stmt
            .query_map(params![guild_id], row_to_record)
            .map_err(MakroError::storage)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(MakroError::storage)
    }

    /// Insert-or-update keyed by `(guild_id, name)`. The `uses` counter of an
    /// existing row is preserved.
    pub async fn upsert_command(&self, guild_id: &str, command: &NewCommand) -> MakroResult<()> {
        let roles = serialize_roles(&command.allowed_roles);
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO commands (id, guild_id, name, reply, description, ephemeral, allowed_roles)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (guild_id, name) DO UPDATE SET
                 reply = excluded.reply,
                 description = excluded.description,
                 ephemeral = excluded.ephemeral,
                 allowed_roles = excluded.allowed_roles",
            params![
                command.id,
                guild_id,
                command.name,
                command.reply,
                command.description,
                command.ephemeral as i64,
                roles,
            ],
        )
        .map_err(MakroError::storage)?;
        Ok(())
    }

    /// Rename-capable update addressing the row by its original name.
    pub async fn update_command(
        &self,
        guild_id: &str,
        original_name: &str,
        command: &NewCommand,
    ) -> MakroResult<()> {
        let roles = serialize_roles(&command.allowed_roles);
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE commands SET name = ?1, reply = ?2, description = ?3, ephemeral = ?4,
                     allowed_roles = ?5
                 WHERE guild_id = ?6 AND name = ?7",
                params![
                    command.name,
                    command.reply,
                    command.description,
                    command.ephemeral as i64,
                    roles,
                    guild_id,
                    original_name,
                ],
            )
            .map_err(MakroError::storage)?;
        if changed == 0 {
            return Err(MakroError::NotFound);
        }
        Ok(())
    }

    /// Delete a command, returning the removed row when it existed.
    pub async fn remove_command(&self, guild_id: &str, name: &str) -> MakroResult<Option<CommandRecord>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "DELETE FROM commands WHERE guild_id = ?1 AND name = ?2
             RETURNING id, name, reply, description, ephemeral, uses, allowed_roles",
            params![guild_id, name],
            row_to_record,
        )
        .optional()
        .map_err(MakroError::storage)
    }

    /// Bump the monotonic usage counter after a successful dispatch.
    pub async fn increment_uses(&self, command_id: &str) -> MakroResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("UPDATE commands SET uses = uses + 1 WHERE id = ?1", params![command_id])
            .map_err(MakroError::storage)?;
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandRecord> {
    Ok(CommandRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        reply: row.get(2)?,
        description: row.get(3)?,
        ephemeral: row.get::<_, i64>(4)? != 0,
        uses: row.get::<_, i64>(5)?.max(0) as u64,
        allowed_roles: parse_roles(&row.get::<_, String>(6)?),
    })
}

fn serialize_roles(roles: &[String]) -> String {
    serde_json::to_string(&normalize_roles(roles)).unwrap_or_else(|_| "[]".to_string())
}

fn parse_roles(raw: &str) -> Vec<String> {
    let Ok(parsed) = serde_json::from_str::<Vec<String>>(raw) else {
        return Vec::new();
    };
    normalize_roles(&parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_command(name: &str) -> NewCommand {
        NewCommand {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            reply: "hello [[user.name]]".to_string(),
            description: "greets".to_string(),
            ephemeral: false,
            allowed_roles: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ensure_guild_is_idempotent_with_default_quota() {
        let store = MakroStore::in_memory(50).unwrap();
        let first = store.ensure_guild("g1").await.unwrap();
        let second = store.ensure_guild("g1").await.unwrap();
        assert_eq!(first, GuildPolicy { banned: false, max_commands: 50 });
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn limit_and_ban_upserts_survive_each_other() {
        let store = MakroStore::in_memory(50).unwrap();
        store.set_guild_limit("g1", 5).await.unwrap();
        store.set_guild_banned("g1", true).await.unwrap();
        let policy = store.ensure_guild("g1").await.unwrap();
        assert_eq!(policy, GuildPolicy { banned: true, max_commands: 5 });
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MakroStore::in_memory(50).unwrap();
        let mut cmd = new_command("greet");
        cmd.ephemeral = true;
        cmd.allowed_roles = vec!["7".into(), "9".into()];
        store.upsert_command("g1", &cmd).await.unwrap();

        let fetched = store.get_command("g1", "greet").await.unwrap().unwrap();
        assert_eq!(fetched.reply, cmd.reply);
        assert_eq!(fetched.description, cmd.description);
        assert!(fetched.ephemeral);
        assert_eq!(fetched.allowed_roles, vec!["7".to_string(), "9".to_string()]);
        assert_eq!(fetched.uses, 0);
    }

    #[tokio::test]
    async fn upsert_preserves_uses_counter() {
        let store = MakroStore::in_memory(50).unwrap();
        let cmd = new_command("greet");
        store.upsert_command("g1", &cmd).await.unwrap();
        store.increment_uses(&cmd.id).await.unwrap();

        let mut edited = cmd.clone();
        edited.reply = "changed".to_string();
        store.upsert_command("g1", &edited).await.unwrap();

        let fetched = store.get_command("g1", "greet").await.unwrap().unwrap();
        assert_eq!(fetched.uses, 1);
        assert_eq!(fetched.reply, "changed");
    }

    #[tokio::test]
    async fn update_renames_and_errors_on_missing_original() {
        let store = MakroStore::in_memory(50).unwrap();
        let cmd = new_command("old");
        store.upsert_command("g1", &cmd).await.unwrap();

        let mut renamed = cmd.clone();
        renamed.name = "new".to_string();
        store.update_command("g1", "old", &renamed).await.unwrap();
        assert!(store.get_command("g1", "old").await.unwrap().is_none());
        assert!(store.get_command("g1", "new").await.unwrap().is_some());

        let missing = store.update_command("g1", "ghost", &renamed).await;
        assert!(matches!(missing, Err(MakroError::NotFound)));
    }

    #[tokio::test]
    async fn remove_returns_row_only_when_present() {
        let store = MakroStore::in_memory(50).unwrap();
        store.upsert_command("g1", &new_command("greet")).await.unwrap();
        assert!(store.remove_command("g1", "greet").await.unwrap().is_some());
        assert!(store.remove_command("g1", "greet").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn command_count_is_per_guild() {
        let store = MakroStore::in_memory(50).unwrap();
        store.upsert_command("g1", &new_command("a")).await.unwrap();
        store.upsert_command("g1", &new_command("b")).await.unwrap();
        store.upsert_command("g2", &new_command("a")).await.unwrap();
        assert_eq!(store.command_count("g1").await.unwrap(), 2);
        assert_eq!(store.command_count("g2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_is_name_ordered() {
        let store = MakroStore::in_memory(50).unwrap();
        store.upsert_command("g1", &new_command("zebra")).await.unwrap();
        store.upsert_command("g1", &new_command("apple")).await.unwrap();
        let names: Vec<_> = store
            .list_commands("g1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["apple", "zebra"]);
    }

    #[tokio::test]
    async fn allowed_roles_are_deduped_and_capped() {
        let store = MakroStore::in_memory(50).unwrap();
        let mut cmd = new_command("greet");
        cmd.allowed_roles = (0..30).map(|i| format!("{}", i % 28)).collect();
        store.upsert_command("g1", &cmd).await.unwrap();
        let fetched = store.get_command("g1", "greet").await.unwrap().unwrap();
        assert_eq!(fetched.allowed_roles.len(), 25);
        let unique: std::collections::HashSet<_> = fetched.allowed_roles.iter().collect();
        assert_eq!(unique.len(), 25);
    }
}
