use clap::Args;
use liftlog_core::RecordStore;
use std::path::PathBuf;

use super::CommandError;
use crate::config::Config;

/// Back up the local database
#[derive(Debug, Args)]
pub struct BackupCommand {
    /// Directory to write the backup to (defaults to backup_dir)
    #[arg(long, short)]
    dir: Option<PathBuf>,
}

impl BackupCommand {
    pub async fn run(&self, store: &RecordStore, config: &Config) -> Result<(), CommandError> {
        let dir = self
            .dir
            .clone()
            .unwrap_or_else(|| config.backup_dir.value.clone());

        let path = store.backup(&dir).await?;
        println!("Backup written to {}", path.display());
        Ok(())
    }
}
