//! Sync CLI command for mirroring collections with Notion.

use clap::{Args, ValueEnum};
use liftlog_core::{
    CollectionReport, Direction, InboundReport, OutboundReport, PhaseFailure, RemoteGateway,
    SyncEngine,
};

use super::CommandError;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DirectionArg {
    /// Remote to local only
    Pull,
    /// Local to remote only
    Push,
    #[default]
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Pull => Direction::Pull,
            DirectionArg::Push => Direction::Push,
            DirectionArg::Both => Direction::Both,
        }
    }
}

/// Sync collections with Notion
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Only sync this collection
    #[arg(long)]
    collection: Option<String>,

    /// Which way to sync
    #[arg(long, short, value_enum, default_value = "both")]
    direction: DirectionArg,
}

impl SyncCommand {
    pub async fn run<G: RemoteGateway>(&self, engine: &SyncEngine<G>) -> Result<(), CommandError> {
        if engine.collections().is_empty() {
            println!("No collections configured. Run `liftlog config init` to get started.");
            return Ok(());
        }

        println!("Syncing with Notion...");
        println!();

        let direction = Direction::from(self.direction);
        let reports = match (&self.collection, direction) {
            (None, Direction::Both) => engine.sync_all().await,
            (None, _) => {
                let mut reports = Vec::new();
                for collection in engine.collections() {
                    reports.push(engine.sync_collection(&collection.name, direction).await?);
                }
                reports
            }
            (Some(name), _) => vec![engine.sync_collection(name, direction).await?],
        };

        for report in &reports {
            print_report(report);
        }

        println!();
        let failed = reports.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            return Err(CommandError::Incomplete(failed));
        }
        println!("Sync complete.");
        Ok(())
    }
}

fn print_report(report: &CollectionReport) {
    let status = if report.is_success() { "✓" } else { "✗" };
    println!("  {} {}", status, report.collection);

    match &report.inbound {
        Some(Ok(inbound)) => println!("      pull: {}", describe_inbound(inbound)),
        Some(Err(failure)) => println!("      pull: {}", describe_failure(failure)),
        None => {}
    }
    match &report.outbound {
        Some(Ok(outbound)) => println!("      push: {}", describe_outbound(outbound)),
        Some(Err(failure)) => println!("      push: {}", describe_failure(failure)),
        None => {}
    }
}

fn describe_inbound(report: &InboundReport) -> String {
    if report.fetched == 0 {
        return "up to date".to_string();
    }
    let mut text = format!(
        "{} fetched, {} new, {} duplicate",
        report.fetched, report.inserted, report.duplicates
    );
    if report.linked > 0 {
        text.push_str(&format!(", {} already linked", report.linked));
    }
    if report.failed > 0 {
        text.push_str(&format!(", {} failed", report.failed));
    }
    text
}

fn describe_outbound(report: &OutboundReport) -> String {
    if report.local_only == 0 {
        return "up to date".to_string();
    }
    let mut text = format!("{} uploaded", report.pushed);
    if report.skipped > 0 {
        text.push_str(&format!(", {} already linked", report.skipped));
    }
    if report.failed > 0 {
        text.push_str(&format!(", {} failed", report.failed));
    }
    text
}

fn describe_failure(failure: &PhaseFailure) -> String {
    format!("failed ({}): {}", failure.kind, failure.message)
}
