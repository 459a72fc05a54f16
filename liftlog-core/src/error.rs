//! Error types shared by the store, the schema registry and the sync engine.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Operation on a table that was never created.
    #[error("Table '{table}' not found (available: {available:?})")]
    TableNotFound {
        table: String,
        available: Vec<String>,
    },

    /// The table exists but its metadata entry is missing.
    #[error("Metadata for table '{0}' not found")]
    MetadataNotFound(String),

    /// A record lacks one or more composite key fields.
    #[error("Missing keys in entry: {missing:?}")]
    CompositeKey {
        missing: Vec<String>,
        entry_keys: Vec<String>,
    },

    /// A precondition of a store operation was violated.
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while mapping remote documents to records and back.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The mapped data does not satisfy the record shape.
    #[error("{message}")]
    Model { message: String, context: Value },

    /// The raw document cannot be mapped to the expected shape at all.
    #[error("{message}")]
    Parsing { message: String, context: Value },
}

impl SchemaError {
    /// Payload describing the offending input, for logging.
    pub fn context(&self) -> &Value {
        match self {
            SchemaError::Model { context, .. } | SchemaError::Parsing { context, .. } => context,
        }
    }
}

/// Errors surfaced by a remote gateway. Opaque to the engine.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Errors from a single sync phase of a single collection.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No model registered for collection '{0}'")]
    UnknownCollection(String),
}

impl SyncError {
    /// Short variant name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Store(StoreError::TableNotFound { .. }) => "TableNotFound",
            SyncError::Store(StoreError::MetadataNotFound(_)) => "MetadataNotFound",
            SyncError::Store(StoreError::CompositeKey { .. }) => "CompositeKeyError",
            SyncError::Store(_) => "DatabaseError",
            SyncError::Schema(SchemaError::Model { .. }) => "ModelError",
            SyncError::Schema(SchemaError::Parsing { .. }) => "ParsingError",
            SyncError::Gateway(_) => "TransportError",
            SyncError::UnknownCollection(_) => "UnknownCollection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_message_lists_missing_fields() {
        let err = StoreError::CompositeKey {
            missing: vec!["set_number".to_string(), "exercise_id".to_string()],
            entry_keys: vec!["date".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("set_number"));
        assert!(msg.contains("exercise_id"));
    }

    #[test]
    fn test_sync_error_kind() {
        let err: SyncError = StoreError::MetadataNotFound("exercise".to_string()).into();
        assert_eq!(err.kind(), "MetadataNotFound");

        let err: SyncError = SchemaError::Parsing {
            message: "bad".to_string(),
            context: Value::Null,
        }
        .into();
        assert_eq!(err.kind(), "ParsingError");
    }
}
