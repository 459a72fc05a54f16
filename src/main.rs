use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod notion;

use commands::{BackupCommand, ConfigCommand, SetCommand, StatusCommand, SyncCommand};
use config::Config;
use liftlog_core::{RecordStore, Shape, SyncEngine};
use notion::NotionClient;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(version)]
#[command(about = "Mirror workout logs between Notion and a local database", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync collections with Notion
    Sync(SyncCommand),

    /// Back up the local database
    Backup(BackupCommand),

    /// Show sync state per collection
    Status(StatusCommand),

    /// Log and edit completed sets locally
    Set(SetCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "liftlog=debug,liftlog_core=debug"
    } else {
        "liftlog=info,liftlog_core=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::Sync(cmd)) => {
            let store = RecordStore::open(config.database_path.value.clone()).await?;
            for name in config.unconfigured_collections() {
                eprintln!(
                    "Skipping '{}': remote_id is not set. Add it to the config file or set {}.",
                    name,
                    collection_env_hint(name)
                );
            }
            let client = NotionClient::from_config(&config.notion)?;
            let engine = SyncEngine::new(store, client, config.syncable_collections());
            cmd.run(&engine).await?;
        }
        Some(Commands::Backup(cmd)) => {
            let store = RecordStore::open(config.database_path.value.clone()).await?;
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Status(cmd)) => {
            let store = RecordStore::open(config.database_path.value.clone()).await?;
            cmd.run(store, &config).await?;
        }
        Some(Commands::Set(cmd)) => {
            let store = RecordStore::open(config.database_path.value.clone()).await?;
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli.config.as_deref())?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn collection_env_hint(name: &str) -> String {
    match Shape::for_collection(name) {
        Some(shape) => Config::collection_env_var(shape),
        None => "its remote_id".to_string(),
    }
}
