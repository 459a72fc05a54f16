use clap::{Args, Subcommand, ValueEnum};
use liftlog_core::Shape;
use std::path::Path;

use crate::config::{Config, ConfigError};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Write a starter config file
    Init,
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<&Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_config(config),
                }
                Ok(())
            }
            ConfigSubcommand::Init => {
                let path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(Config::default_config_path);
                match Config::init_file(&path) {
                    Ok(()) => {
                        println!("Wrote {}", path.display());
                        println!("Fill in each collection's remote_id and set LIFTLOG_NOTION_TOKEN.");
                        Ok(())
                    }
                    Err(ConfigError::AlreadyExists(path)) => {
                        println!("Config file already exists: {}", path.display());
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

fn print_config(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("database_path: {}", config.database_path.value.display());
    println!("  source: {}", config.database_path.source);
    println!();

    println!("backup_dir: {}", config.backup_dir.value.display());
    println!("  source: {}", config.backup_dir.source);
    println!();

    println!("notion:");
    println!(
        "  api_key: {}",
        if config.notion.is_configured() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  api_version: {}", config.notion.api_version);
    println!("  base_url: {}", config.notion.base_url);
    println!("  timeout_secs: {}", config.notion.timeout_secs);
    println!();

    println!("collections:");
    if config.collections.is_empty() {
        println!("  (none)");
    }
    for collection in &config.collections {
        let known = if Shape::for_collection(&collection.name).is_some() {
            ""
        } else {
            "  (unknown collection)"
        };
        println!(
            "  {} -> {}{}",
            collection.name, collection.remote_id, known
        );
    }
}
