use clap::Args;
use liftlog_core::{collection_status, CollectionStatus, RecordStore, SyncEngine};

use super::CommandError;
use crate::config::Config;
use crate::notion::NotionClient;

/// Show local sync state for each collection
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Also query Notion for each collection's database
    #[arg(long)]
    remote: bool,
}

impl StatusCommand {
    pub async fn run(&self, store: RecordStore, config: &Config) -> Result<(), CommandError> {
        println!("Sync Status");
        println!("===========");
        println!();
        println!("Database: {}", store.path().display());
        println!();

        if config.collections.is_empty() {
            println!("No collections configured.");
            println!();
            println!("Add to your config file:");
            println!();
            println!("  collections:");
            println!("    - name: workout_log");
            println!("      remote_id: \"your-database-id\"");
            return Ok(());
        }

        for status in collection_status(&store, &config.collections).await? {
            print_status(&status);
        }

        if !self.remote {
            return Ok(());
        }

        println!("Remote");
        println!("------");
        println!();

        for name in config.unconfigured_collections() {
            println!("{}: skipped, remote_id is not set", name);
        }

        let client = NotionClient::from_config(&config.notion)?;
        let engine = SyncEngine::new(store, client, config.syncable_collections());
        for collection in engine.collections() {
            match engine.remote_info(collection).await {
                Ok(info) => {
                    println!("{}: {}", collection.name, info.title);
                    if let Some(edited) = &info.last_edited_time {
                        println!("  last edited: {}", edited);
                    }
                    if let Some(properties) = info.properties.as_object() {
                        let names: Vec<&str> = properties.keys().map(String::as_str).collect();
                        println!("  properties:  {}", names.join(", "));
                    }
                }
                Err(e) => println!("{}: ✗ {}", collection.name, e),
            }
        }

        Ok(())
    }
}

fn print_status(status: &CollectionStatus) {
    println!("{}", status.collection.name);
    println!("  remote id:   {}", status.collection.remote_id);

    match &status.metadata {
        Some(metadata) => {
            println!("  records:     {}", status.records);
            println!("  key:         {}", metadata.composite_key.join(", "));
            match metadata.synced_at {
                Some(synced_at) => println!("  last pulled: {}", synced_at.to_rfc3339()),
                None => println!("  last pulled: never"),
            }
        }
        None => println!("  not synced yet"),
    }
    println!();
}
