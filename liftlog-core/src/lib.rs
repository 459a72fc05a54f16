//! Liftlog Core Library
//!
//! Local record store, schema registry and sync engine for mirroring workout
//! collections between a remote document database and SQLite.

pub mod engine;
pub mod error;
pub mod gateway;
pub mod key;
pub mod record;
pub mod schema;
pub mod store;

pub use engine::{
    collection_status, default_sync_time, Collection, CollectionReport, CollectionStatus,
    Direction, InboundReport, OutboundReport, PhaseFailure, SyncEngine,
};
pub use error::{GatewayError, SchemaError, StoreError, SyncError};
pub use gateway::RemoteGateway;
pub use key::{build_key, KEY_SEPARATOR};
pub use record::{Partition, Record, Records};
pub use schema::{CompletedSet, Exercise, KeyedModel, RemoteCollectionInfo, Shape};
pub use store::{CollectionMetadata, RecordStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
