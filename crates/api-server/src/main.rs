//! API Server binary entrypoint.

use api_server::{ApiServer, ServerConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whale_core::config::Config as WhaleConfig;
use whale_core::db::{create_pool, run_migrations};

/// Whale Tracker API server
#[derive(Parser)]
#[command(name = "api-server")]
#[command(about = "REST and WebSocket API for the whale tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server, scheduler and ingestors (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "api_server=info,tower_http=error,sqlx=warn,hyper=warn,h2=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let whale_config = WhaleConfig::from_env()?;
    let pool = create_pool(&whale_config.database).await?;

    match cli.command {
        Some(Commands::Migrate) => {
            tracing::info!("running database migrations");
            run_migrations(&pool).await?;
        }
        Some(Commands::Serve) | None => {
            run_migrations(&pool).await?;
            run_server(whale_config, pool).await?;
        }
    }

    Ok(())
}

async fn run_server(whale_config: WhaleConfig, pool: sqlx::PgPool) -> anyhow::Result<()> {
    tracing::info!("whale tracker api server starting up");

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "server configuration loaded");

    let server = ApiServer::new(config, whale_config, pool).await?;
    server.run().await?;

    Ok(())
}
