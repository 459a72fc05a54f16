mod backup_cmd;
mod config_cmd;
mod set_cmd;
mod status_cmd;
mod sync_cmd;

pub use backup_cmd::BackupCommand;
pub use config_cmd::ConfigCommand;
pub use set_cmd::SetCommand;
pub use status_cmd::StatusCommand;
pub use sync_cmd::SyncCommand;

use liftlog_core::{GatewayError, SyncError};

/// Errors from CLI commands
#[derive(Debug)]
pub enum CommandError {
    Sync(SyncError),
    Gateway(GatewayError),
    /// One or more collections had a failed sync phase
    Incomplete(usize),
    /// Rejected user input
    Invalid(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Sync(e) => write!(f, "{}", e),
            CommandError::Gateway(e) => write!(f, "{}", e),
            CommandError::Incomplete(failed) => write!(
                f,
                "Sync incomplete: {} collection{} failed",
                failed,
                if *failed == 1 { "" } else { "s" }
            ),
            CommandError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Sync(e) => Some(e),
            CommandError::Gateway(e) => Some(e),
            CommandError::Incomplete(_) | CommandError::Invalid(_) => None,
        }
    }
}

impl From<SyncError> for CommandError {
    fn from(e: SyncError) -> Self {
        CommandError::Sync(e)
    }
}

impl From<GatewayError> for CommandError {
    fn from(e: GatewayError) -> Self {
        CommandError::Gateway(e)
    }
}

impl From<liftlog_core::StoreError> for CommandError {
    fn from(e: liftlog_core::StoreError) -> Self {
        CommandError::Sync(SyncError::Store(e))
    }
}
