//! Bidirectional reconciliation between a remote gateway and the record store.
//!
//! Each registered collection is synced in two independent phases:
//!
//! 1. **Inbound** (remote → local): fetch documents edited since the
//!    watermark, normalize them, insert the ones with unseen keys, then
//!    advance the watermark.
//! 2. **Outbound** (local → remote): fetch the full remote listing, find local
//!    records whose key is absent remotely, create each one remotely and stamp
//!    the returned id back onto the local record.
//!
//! A failed phase leaves already-committed work in place and never blocks the
//! other phase or other collections. Key-based dedupe makes re-fetching safe.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, SyncError};
use crate::gateway::RemoteGateway;
use crate::key::build_key;
use crate::record::Record;
use crate::schema::{parse_database_info, RemoteCollectionInfo, Shape};
use crate::store::{CollectionMetadata, RecordStore};

/// Watermark used for a collection that was never synced: 2000-01-01T00:00:00Z.
const SENTINEL_EPOCH_SECS: i64 = 946_684_800;

pub fn default_sync_time() -> DateTime<Utc> {
    DateTime::from_timestamp(SENTINEL_EPOCH_SECS, 0).unwrap_or_default()
}

/// A collection mirrored between the remote and the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Local table name; also selects the record shape.
    pub name: String,
    /// Remote collection (database) id.
    pub remote_id: String,
}

impl Collection {
    pub fn new(name: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_id: remote_id.into(),
        }
    }

    fn shape(&self) -> Result<Shape, SyncError> {
        Shape::for_collection(&self.name)
            .ok_or_else(|| SyncError::UnknownCollection(self.name.clone()))
    }
}

/// Which phases to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Pull,
    Push,
    #[default]
    Both,
}

impl Direction {
    fn pulls(self) -> bool {
        matches!(self, Direction::Pull | Direction::Both)
    }

    fn pushes(self) -> bool {
        matches!(self, Direction::Push | Direction::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InboundReport {
    /// Documents returned by the incremental listing.
    pub fetched: usize,
    /// Fetched documents already linked to a local record by remote id.
    pub linked: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Watermark after the cycle.
    pub watermark: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutboundReport {
    /// Local records whose key is absent from the remote listing.
    pub local_only: usize,
    /// Local-only records already linked to an existing remote document.
    pub skipped: usize,
    pub pushed: usize,
    pub failed: usize,
}

/// A phase that stopped early.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseFailure {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    /// `None` when the phase was not requested.
    pub inbound: Option<Result<InboundReport, PhaseFailure>>,
    pub outbound: Option<Result<OutboundReport, PhaseFailure>>,
}

impl CollectionReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.inbound, Some(Err(_))) && !matches!(self.outbound, Some(Err(_)))
    }
}

/// Local view of a registered collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub collection: Collection,
    /// `None` until the first inbound sync creates the table.
    pub metadata: Option<CollectionMetadata>,
    pub records: i64,
}

/// Drives sync cycles for a fixed set of collections.
pub struct SyncEngine<G> {
    store: RecordStore,
    gateway: G,
    collections: Vec<Collection>,
}

impl<G: RemoteGateway> SyncEngine<G> {
    pub fn new(store: RecordStore, gateway: G, collections: Vec<Collection>) -> Self {
        Self {
            store,
            gateway,
            collections,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Runs inbound then outbound for every registered collection.
    ///
    /// Never fails: every phase error is logged and recorded in the report.
    pub async fn sync_all(&self) -> Vec<CollectionReport> {
        let mut reports = Vec::with_capacity(self.collections.len());
        for collection in &self.collections {
            reports.push(self.run(collection, Direction::Both).await);
        }
        reports
    }

    /// Runs the requested phases for one registered collection.
    pub async fn sync_collection(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<CollectionReport, SyncError> {
        let collection = self
            .collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SyncError::UnknownCollection(name.to_string()))?;

        Ok(self.run(collection, direction).await)
    }

    async fn run(&self, collection: &Collection, direction: Direction) -> CollectionReport {
        let inbound = if direction.pulls() {
            Some(
                self.sync_remote_to_local(collection)
                    .await
                    .map_err(|e| phase_failed(collection, "inbound", e)),
            )
        } else {
            None
        };

        let outbound = if direction.pushes() {
            Some(
                self.sync_local_to_remote(collection)
                    .await
                    .map_err(|e| phase_failed(collection, "outbound", e)),
            )
        } else {
            None
        };

        CollectionReport {
            collection: collection.name.clone(),
            inbound,
            outbound,
        }
    }

    /// Pulls documents edited since the watermark into the local table.
    ///
    /// The watermark advances after every cycle that completes without error,
    /// including one that fetched nothing. It is set to the instant the fetch
    /// started, so nothing edited during the cycle is skipped by the next one.
    ///
    /// Documents whose id is already stamped on a local record are counted as
    /// `linked` and not inserted again.
    pub async fn sync_remote_to_local(
        &self,
        collection: &Collection,
    ) -> Result<InboundReport, SyncError> {
        let shape = collection.shape()?;
        let name = collection.name.as_str();
        tracing::info!("Syncing from remote to local for '{}'", name);

        if !self.store.table_exists(name).await? {
            tracing::info!("Creating local table for '{}'", name);
            self.store
                .create_table(name, shape, Some(&collection.remote_id))
                .await?;
        }

        let since = match self.store.get_last_sync_time(name).await {
            Ok(Some(synced_at)) => synced_at,
            Ok(None) => default_sync_time(),
            Err(e) => {
                tracing::warn!(
                    collection = name,
                    error = %e,
                    "Could not read last sync time, falling back to default"
                );
                default_sync_time()
            }
        };
        tracing::info!("Last sync for '{}': {}", name, since);

        let cycle_started = Utc::now();
        let pages = self
            .gateway
            .list_since(&collection.remote_id, since)
            .await?;
        let normalized = shape.normalize_all(&pages)?;

        let mut report = InboundReport {
            fetched: normalized.len(),
            ..Default::default()
        };

        if normalized.is_empty() {
            tracing::info!("No new data to sync from remote for '{}'.", name);
        }

        let linked = self.linked_remote_ids(name, shape).await?;
        let mut records = Vec::with_capacity(normalized.len());
        for (page, record) in pages.iter().zip(normalized) {
            match Shape::document_id(page) {
                Some(id) if linked.contains(id) => {
                    report.linked += 1;
                    tracing::debug!(
                        collection = name,
                        page_id = id,
                        key = %build_key(shape.composite_key(), &record).unwrap_or_default(),
                        "Skipping document already linked to a local record"
                    );
                }
                _ => records.push(record),
            }
        }

        if !records.is_empty() {
            tracing::info!("Inserting {} records into '{}'", records.len(), name);
        }
        let partition = self.store.add(name, records).await?;
        report.inserted = partition.inserted.len();
        report.duplicates = partition.duplicates.len();
        report.failed = partition.failed.len();

        report.watermark = self.store.update_last_sync_time(name, cycle_started).await?;
        tracing::info!(
            collection = name,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "Inbound sync complete"
        );
        Ok(report)
    }

    /// Creates remotely every local record whose key is absent from the full
    /// remote listing, and stamps the new remote id onto the local record.
    pub async fn sync_local_to_remote(
        &self,
        collection: &Collection,
    ) -> Result<OutboundReport, SyncError> {
        let shape = collection.shape()?;
        let name = collection.name.as_str();
        tracing::info!("Syncing from local to remote for '{}'", name);

        let pages = self.gateway.list_all(&collection.remote_id).await?;
        let remote_records = shape.normalize_all(&pages)?;
        let remote_ids: HashSet<&str> = pages.iter().filter_map(Shape::document_id).collect();

        let local_only = self.store.get_new_entries(&remote_records, name).await?;
        let mut report = OutboundReport {
            local_only: local_only.len(),
            ..Default::default()
        };

        if local_only.is_empty() {
            tracing::info!("No new entries to upload for '{}'.", name);
            return Ok(report);
        }

        for mut record in local_only {
            if shape
                .linked_remote_id(&record)
                .is_some_and(|id| remote_ids.contains(id))
            {
                report.skipped += 1;
                continue;
            }

            match self.push_record(collection, shape, &mut record).await {
                Ok(remote_id) => {
                    report.pushed += 1;
                    tracing::info!("Uploaded new page for '{}' with ID {}", name, remote_id);
                }
                Err(e) => {
                    report.failed += 1;
                    let entry = Value::Object(record);
                    tracing::error!(
                        collection = name,
                        kind = e.kind(),
                        error = %e,
                        entry = %entry,
                        "Failed to upload entry"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn push_record(
        &self,
        collection: &Collection,
        shape: Shape,
        record: &mut Record,
    ) -> Result<String, SyncError> {
        let properties = shape.encode(record)?;
        let remote_id = self
            .gateway
            .create_document(&collection.remote_id, properties)
            .await?;

        record.insert(
            shape.remote_id_field().to_string(),
            Value::String(remote_id.clone()),
        );

        if self.store.update(&collection.name, record).await?.is_none() {
            return Err(StoreError::Database(format!(
                "Entry disappeared before remote id {} could be recorded",
                remote_id
            ))
            .into());
        }

        Ok(remote_id)
    }

    async fn linked_remote_ids(
        &self,
        name: &str,
        shape: Shape,
    ) -> Result<HashSet<String>, SyncError> {
        Ok(self
            .store
            .all(name)
            .await?
            .iter()
            .filter_map(|record| shape.linked_remote_id(record))
            .map(str::to_string)
            .collect())
    }

    /// Metadata and record counts for every registered collection.
    pub async fn collection_status(&self) -> Result<Vec<CollectionStatus>, SyncError> {
        collection_status(&self.store, &self.collections).await
    }

    /// Describes the remote side of a collection.
    pub async fn remote_info(
        &self,
        collection: &Collection,
    ) -> Result<RemoteCollectionInfo, SyncError> {
        let raw = self
            .gateway
            .get_collection_metadata(&collection.remote_id)
            .await?;
        Ok(parse_database_info(&raw))
    }

    /// Snapshots the store file into `dir`.
    pub async fn backup(&self, dir: &Path) -> Result<PathBuf, SyncError> {
        Ok(self.store.backup(dir).await?)
    }
}

/// Local status of `collections`; needs no remote access.
pub async fn collection_status(
    store: &RecordStore,
    collections: &[Collection],
) -> Result<Vec<CollectionStatus>, SyncError> {
    let mut statuses = Vec::with_capacity(collections.len());
    for collection in collections {
        let (metadata, records) = if store.table_exists(&collection.name).await? {
            (
                Some(store.metadata(&collection.name).await?),
                store.count(&collection.name).await?,
            )
        } else {
            (None, 0)
        };

        statuses.push(CollectionStatus {
            collection: collection.clone(),
            metadata,
            records,
        });
    }
    Ok(statuses)
}

fn phase_failed(collection: &Collection, phase: &'static str, e: SyncError) -> PhaseFailure {
    match &e {
        SyncError::Schema(schema_error) => tracing::error!(
            collection = %collection.name,
            phase,
            kind = e.kind(),
            error = %e,
            context = %schema_error.context(),
            "Sync phase aborted"
        ),
        _ => tracing::error!(
            collection = %collection.name,
            phase,
            kind = e.kind(),
            error = %e,
            "Sync phase aborted"
        ),
    }

    PhaseFailure {
        kind: e.kind(),
        message: e.to_string(),
    }
}
