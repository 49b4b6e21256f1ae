use serde::Deserialize;

/// Makro runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Application id the registry routes belong to
    pub app_id: String,
    /// Bot token for registry calls
    pub bot_token: String,
    /// Hex-encoded webhook verification key
    pub public_key: String,
    /// Admin surface secret; generated per run when unset
    pub admin_secret: Option<String>,
    /// Default per-guild command quota
    pub max_commands: u32,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "makro.db".to_string(),
            app_id: String::new(),
            bot_token: String::new(),
            public_key: String::new(),
            admin_secret: None,
            max_commands: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("MAKRO_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("MAKRO_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_path: std::env::var("MAKRO_DB").unwrap_or(defaults.db_path),
            app_id: std::env::var("DISCORD_APP_ID").unwrap_or_default(),
            bot_token: std::env::var("DISCORD_TOKEN").unwrap_or_default(),
            public_key: std::env::var("DISCORD_PUBLIC_KEY").unwrap_or_default(),
            admin_secret: std::env::var("MAKRO_ADMIN_SECRET").ok(),
            max_commands: std::env::var("MAKRO_MAX_COMMANDS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_commands),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}
