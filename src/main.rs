//! Agenda CLI entry point.
//!
//! Provides `serve` to run the HTTP service and `schema` to print the schema.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use agenda::config::AgendaConfig;
use agenda::credentials::load_service_credentials;
use agenda::engine::ContactEngine;
use agenda::logging;
use agenda::phone::ninjas::NinjasClient;
use agenda::query::QueryExecutor;
use agenda::schema::SCHEMA_SDL;
use agenda::server::{self, AppState};
use agenda::store::sqlite::SqliteContactRepository;
use agenda::store::UuidGenerator;

/// Agenda contact directory service.
#[derive(Parser)]
#[command(name = "agenda", version, about)]
struct Cli {
    /// Path to the config file (default: `$AGENDA_CONFIG_PATH` or `./agenda.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,
    /// Print the schema definition and exit.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => handle_serve(cli.config).await,
        Command::Schema => {
            print!("{SCHEMA_SDL}");
            Ok(())
        }
    }
}

/// Load config, wire the engine and serve until ctrl-c.
async fn handle_serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AgendaConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    let _logging_guard = match &config.logging.dir {
        Some(dir) => Some(logging::init_production(dir, &config.logging.level)?),
        None => {
            logging::init_console(&config.logging.level);
            None
        }
    };

    let key_name = &config.phone_service.api_key_env;
    let credentials = load_service_credentials(&config.credentials.env_file, key_name)
        .context("failed to load credentials")?;
    let api_key = credentials.get(key_name).map(str::to_owned);
    if api_key.is_none() {
        warn!(credential = %key_name, "phone service key not set; writes and time lookups will fail");
    }

    let phone = NinjasClient::new(&config.phone_service.base_url, api_key)
        .context("failed to build phone service client")?;

    let contacts = SqliteContactRepository::connect(
        &config.database.url,
        config.database.max_connections,
        Arc::new(UuidGenerator),
    )
    .await?;
    info!(url = %config.database.url, "contact store opened");

    let engine = Arc::new(ContactEngine::new(Arc::new(contacts), Arc::new(phone)));
    let executor = Arc::new(QueryExecutor::new(engine, config.query.max_depth));

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    server::serve(listener, AppState::new(executor), shutdown_signal()).await?;
    info!("agenda shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal, draining connections");
}
