mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use makro_gateway::AppState;
use makro_gateway::admin::AdminAuth;
use makro_gateway::server;
use makro_registry::RegistryClient;
use makro_store::MakroStore;

use config::Config;

#[derive(Parser)]
#[command(name = "makro")]
#[command(about = "Makro: custom slash commands over a signed webhook")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Check whether a local server is up
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config { port: port.unwrap_or(config.port), ..config };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/", config.port))
                .send()
                .await
            {
                Ok(resp) => println!("makro is up: {}", resp.status()),
                Err(_) => println!("makro is not running on port {}", config.port),
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    if config.app_id.is_empty() || config.bot_token.is_empty() {
        bail!("DISCORD_APP_ID and DISCORD_TOKEN must be set");
    }
    let public_key = hex::decode(&config.public_key)
        .context("DISCORD_PUBLIC_KEY must be hex")?;
    if public_key.len() != 32 {
        bail!("DISCORD_PUBLIC_KEY must decode to 32 bytes");
    }

    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        max_commands = config.max_commands,
        "Starting makro"
    );

    let store = Arc::new(MakroStore::open(&config.db_path, config.max_commands)?);
    let registry = Arc::new(RegistryClient::new(&config.app_id, &config.bot_token));
    let state = Arc::new(AppState {
        store,
        registry,
        public_key,
        admin: AdminAuth::resolve(config.admin_secret.clone()),
    });

    let router = server::app(state).layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
