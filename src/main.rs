use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};
use tracing::info;

mod clock;
mod commands;
mod config;
mod controllers;
mod db;
mod error;
mod storage;
mod types;

use clock::{SharedClock, SystemClock};
use config::{Config, StoreKind};
use db::Database;
pub(crate) use error::{ApiResult, AppResult};
use storage::{AnyStore, MemoryStore};

/// Share text that disappears after a time limit or a number of views.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Delete every paste that has expired or used up its views.
    PurgeExpired,
}

#[derive(Clone, FromRef)]
pub struct App {
    config: Config,
    store: AnyStore,
    clock: SharedClock,
}

impl App {
    async fn load(config: Config) -> anyhow::Result<Self> {
        let store = match config.store.kind {
            StoreKind::Sql => {
                Database::connect(&config.database.url, config.database.max_connections)
                    .await
                    .context("failed to connect to database")?
                    .into()
            }
            StoreKind::Memory => MemoryStore::new().into(),
        };
        info!("using {:?} paste store", config.store.kind);

        Ok(App {
            config,
            store,
            clock: Arc::new(SystemClock),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let app = App::load(config).await?;

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}
