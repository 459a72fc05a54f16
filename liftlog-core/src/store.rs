//! Table-oriented record store on SQLite.
//!
//! Every collection is a named table of JSON records identified by the
//! composite key declared at creation. The store owns duplicate detection,
//! per-table metadata and the last-sync watermark.
//!
//! # Layout
//!
//! - `collections`: one row per created table
//! - `metadata`: shape descriptor, composite key, remote id and timestamps
//! - `records`: JSON bodies, plus one placeholder row per table until the
//!   table receives its first real record
//!
//! Reads never return placeholder rows.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;
use crate::key::{build_key, key_matches};
use crate::record::{Partition, Record, Records};
use crate::schema::Shape;

const PLACEHOLDER_BODY: &str = r#"{"_init":true}"#;

/// Metadata kept for each collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionMetadata {
    pub table_name: String,
    pub table_model: Value,
    pub composite_key: Vec<String>,
    pub remote_id: Option<String>,
    /// Last successful inbound sync. `None` means never synced.
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MetadataRow {
    table_name: String,
    table_model: String,
    composite_key: String,
    remote_id: Option<String>,
    synced_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    body: String,
}

pub struct RecordStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl RecordStore {
    /// Opens (or creates) the store file and applies migrations.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .foreign_keys(true)
            .create_if_missing(true);

        // One connection: the store has a single owner and no concurrent writers.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, path })
    }

    /// Path of the underlying store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all created tables.
    pub async fn tables(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Creates a table for `shape` with a placeholder record and its metadata.
    ///
    /// Does nothing if the table already exists.
    pub async fn create_table(
        &self,
        name: &str,
        shape: Shape,
        remote_id: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.table_exists(name).await? {
            tracing::warn!("Table '{}' already exists.", name);
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO collections (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO records (table_name, body, placeholder) VALUES (?, ?, 1)")
            .bind(name)
            .bind(PLACEHOLDER_BODY)
            .execute(&mut *tx)
            .await?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT table_name FROM metadata WHERE table_name = ?")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            tracing::warn!("Metadata for table '{}' already exists.", name);
        } else {
            let table_model = serde_json::to_string(&shape.descriptor())?;
            let composite_key = serde_json::to_string(shape.composite_key())?;

            sqlx::query(
                r#"
                INSERT INTO metadata (table_name, table_model, composite_key, remote_id, synced_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, NULL, ?, ?)
                "#,
            )
            .bind(name)
            .bind(&table_model)
            .bind(&composite_key)
            .bind(remote_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Table '{}' created.", name);
        Ok(())
    }

    /// Ordered composite key fields declared for a table.
    pub async fn get_composite_key_fields(&self, name: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_table(name).await?;

        let row = self
            .metadata_row(name)
            .await?
            .ok_or_else(|| StoreError::MetadataNotFound(name.to_string()))?;

        Ok(serde_json::from_str(&row.composite_key)?)
    }

    /// Splits `records` into new, duplicate and failed entries.
    ///
    /// The set of known keys starts from what is stored and grows with every
    /// accepted record, so the first occurrence of a key within the batch wins.
    pub async fn filter_duplicates(
        &self,
        name: &str,
        records: &[Record],
    ) -> Result<Partition, StoreError> {
        let key_fields = self.get_composite_key_fields(name).await?;

        let mut known = HashSet::new();
        for (_, existing) in self.load_records(name).await? {
            known.insert(build_key(&key_fields, &existing)?);
        }

        let mut partition = Partition::default();
        for record in records {
            let key = match build_key(&key_fields, record) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!("Skipping entry for '{}': {}", name, e);
                    partition.failed.push(record.clone());
                    continue;
                }
            };

            if known.insert(key.clone()) {
                partition.inserted.push(record.clone());
            } else {
                tracing::debug!("Duplicate entry found for {}. Entry not added.", key);
                partition.duplicates.push(record.clone());
            }
        }

        Ok(partition)
    }

    /// Inserts every record whose key is not yet known.
    ///
    /// Returns the partition computed by [`filter_duplicates`](Self::filter_duplicates).
    pub async fn add(
        &self,
        name: &str,
        records: impl Into<Records>,
    ) -> Result<Partition, StoreError> {
        let Records(records) = records.into();

        if self.metadata_row(name).await?.is_none() {
            return Err(StoreError::MetadataNotFound(name.to_string()));
        }

        if records.is_empty() {
            tracing::warn!("No entries to add to '{}' table.", name);
            return Ok(Partition::default());
        }

        let partition = self.filter_duplicates(name, &records).await?;

        if partition.inserted.is_empty() {
            tracing::info!("No new entries to insert into '{}'.", name);
        } else {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM records WHERE table_name = ? AND placeholder = 1")
                .bind(name)
                .execute(&mut *tx)
                .await?;

            for record in &partition.inserted {
                sqlx::query("INSERT INTO records (table_name, body, placeholder) VALUES (?, ?, 0)")
                    .bind(name)
                    .bind(serde_json::to_string(record)?)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query("UPDATE metadata SET updated_at = ? WHERE table_name = ?")
                .bind(Utc::now().to_rfc3339())
                .bind(name)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            tracing::info!(
                "Inserted {} new entries into '{}' table.",
                partition.inserted.len(),
                name
            );
        }

        if !partition.failed.is_empty() {
            tracing::error!(
                "Failed to insert {} entries into '{}' table.",
                partition.failed.len(),
                name
            );
        }

        Ok(partition)
    }

    /// Replaces the stored record with the same composite key.
    ///
    /// Returns `None` if no stored record has that key.
    pub async fn update(&self, name: &str, record: &Record) -> Result<Option<Record>, StoreError> {
        if record.is_empty() {
            return Err(StoreError::Database("Entry cannot be empty.".to_string()));
        }

        let key_fields = self.get_composite_key_fields(name).await?;
        let key = build_key(&key_fields, record).map_err(|e| {
            StoreError::Database(format!("Cannot locate entry to update: {}", e))
        })?;

        for (id, existing) in self.load_records(name).await? {
            if build_key(&key_fields, &existing).ok().as_deref() != Some(key.as_str()) {
                continue;
            }

            sqlx::query("UPDATE records SET body = ? WHERE id = ?")
                .bind(serde_json::to_string(record)?)
                .bind(id)
                .execute(&self.pool)
                .await?;

            tracing::info!("Updated entry in '{}' table.", name);
            return Ok(Some(record.clone()));
        }

        Ok(None)
    }

    /// Removes the records matching every field of `key_values`.
    pub async fn delete(&self, name: &str, key_values: &Record) -> Result<bool, StoreError> {
        let ids: Vec<i64> = self
            .matching(name, key_values)
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        if ids.is_empty() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        for id in &ids {
            sqlx::query("DELETE FROM records WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(true)
    }

    /// Records matching every field of `key_values`.
    pub async fn get(&self, name: &str, key_values: &Record) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .matching(name, key_values)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Every stored record of a table, in insertion order.
    pub async fn all(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .load_records(name)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    pub async fn count(&self, name: &str) -> Result<i64, StoreError> {
        self.ensure_table(name).await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM records WHERE table_name = ? AND placeholder = 0",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Stored records whose key does not appear among `candidates`.
    pub async fn get_new_entries(
        &self,
        candidates: &[Record],
        name: &str,
    ) -> Result<Vec<Record>, StoreError> {
        let key_fields = self.get_composite_key_fields(name).await?;

        let candidate_keys = candidates
            .iter()
            .map(|record| build_key(&key_fields, record))
            .collect::<Result<HashSet<_>, _>>()?;

        let mut new_entries = Vec::new();
        for (_, record) in self.load_records(name).await? {
            if !candidate_keys.contains(&build_key(&key_fields, &record)?) {
                new_entries.push(record);
            }
        }

        Ok(new_entries)
    }

    /// Last successful inbound sync, or `None` if the table was never synced.
    pub async fn get_last_sync_time(&self, name: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.ensure_table(name).await?;

        let row = self
            .metadata_row(name)
            .await?
            .ok_or_else(|| StoreError::MetadataNotFound(name.to_string()))?;

        row.synced_at.as_deref().map(parse_timestamp).transpose()
    }

    /// Advances the watermark to `at`. The watermark never moves backwards.
    ///
    /// Returns the stored watermark, or `None` if the table has no metadata.
    pub async fn update_last_sync_time(
        &self,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.ensure_table(name).await?;

        let row = match self.metadata_row(name).await? {
            Some(row) => row,
            None => {
                tracing::warn!(
                    "No metadata entry found for table '{}' to update sync time.",
                    name
                );
                return Ok(None);
            }
        };

        let previous = row.synced_at.as_deref().map(parse_timestamp).transpose()?;
        let synced_at = previous.map_or(at, |prev| prev.max(at));

        sqlx::query("UPDATE metadata SET synced_at = ? WHERE table_name = ?")
            .bind(synced_at.to_rfc3339())
            .bind(name)
            .execute(&self.pool)
            .await?;

        tracing::info!("Updated sync time for table '{}' to {}.", name, synced_at);
        Ok(Some(synced_at))
    }

    pub async fn metadata(&self, name: &str) -> Result<CollectionMetadata, StoreError> {
        self.ensure_table(name).await?;

        let row = self
            .metadata_row(name)
            .await?
            .ok_or_else(|| StoreError::MetadataNotFound(name.to_string()))?;

        Ok(CollectionMetadata {
            table_model: serde_json::from_str(&row.table_model)?,
            composite_key: serde_json::from_str(&row.composite_key)?,
            remote_id: row.remote_id,
            synced_at: row.synced_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            table_name: row.table_name,
        })
    }

    /// Writes a consistent snapshot of the store to a timestamped file in `dir`.
    pub async fn backup(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut target = dir.join(format!("database_backup_{}.db", stamp));
        let mut suffix = 1;
        while target.exists() {
            target = dir.join(format!("database_backup_{}_{}.db", stamp, suffix));
            suffix += 1;
        }

        sqlx::query("VACUUM INTO ?")
            .bind(target.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        tracing::info!("Database backed up to: {}", target.display());
        Ok(target)
    }

    async fn ensure_table(&self, name: &str) -> Result<(), StoreError> {
        if self.table_exists(name).await? {
            return Ok(());
        }
        Err(StoreError::TableNotFound {
            table: name.to_string(),
            available: self.tables().await?,
        })
    }

    async fn metadata_row(&self, name: &str) -> Result<Option<MetadataRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM metadata WHERE table_name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn load_records(&self, name: &str) -> Result<Vec<(i64, Record)>, StoreError> {
        self.ensure_table(name).await?;

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, body FROM records WHERE table_name = ? AND placeholder = 0 ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(i64, Record), StoreError> {
                Ok((row.id, serde_json::from_str(&row.body)?))
            })
            .collect()
    }

    async fn matching(
        &self,
        name: &str,
        key_values: &Record,
    ) -> Result<Vec<(i64, Record)>, StoreError> {
        if key_values.is_empty() {
            return Err(StoreError::Database(
                "Key values cannot be empty.".to_string(),
            ));
        }

        let mut matches = Vec::new();
        for (id, record) in self.load_records(name).await? {
            if key_matches(&record, key_values)? {
                matches.push((id, record));
            }
        }
        Ok(matches)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        store: RecordStore,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        TestContext {
            store,
            _temp_dir: temp_dir,
        }
    }

    async fn setup_with_exercise() -> TestContext {
        let ctx = setup().await;
        ctx.store
            .create_table("exercise", Shape::Exercise, Some("db-exercise"))
            .await
            .unwrap();
        ctx
    }

    fn exercise(id: &str, name: &str) -> Record {
        record_from(json!({"id": id, "name": name}))
    }

    fn set(date: &str, set_number: i64, exercise_id: &str) -> Record {
        record_from(json!({
            "date": date,
            "set_number": set_number,
            "exercise_id": exercise_id,
            "reps": 5,
        }))
    }

    async fn placeholder_rows(store: &RecordStore, name: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE table_name = ? AND placeholder = 1")
            .bind(name)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_schema() {
        let ctx = setup().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&ctx.store.pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(names, vec!["collections", "metadata", "records"]);
    }

    #[tokio::test]
    async fn test_create_table_writes_metadata_and_placeholder() {
        let ctx = setup_with_exercise().await;

        assert!(ctx.store.table_exists("exercise").await.unwrap());
        assert_eq!(ctx.store.count("exercise").await.unwrap(), 0);
        assert_eq!(placeholder_rows(&ctx.store, "exercise").await, 1);

        let metadata = ctx.store.metadata("exercise").await.unwrap();
        assert_eq!(metadata.composite_key, vec!["id"]);
        assert_eq!(metadata.remote_id.as_deref(), Some("db-exercise"));
        assert_eq!(metadata.table_model["title"], "Exercise");
        assert!(metadata.synced_at.is_none());
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        let ctx = setup_with_exercise().await;
        let before = ctx.store.metadata("exercise").await.unwrap();

        ctx.store
            .create_table("exercise", Shape::Exercise, Some("other"))
            .await
            .unwrap();

        assert_eq!(ctx.store.metadata("exercise").await.unwrap(), before);
        assert_eq!(placeholder_rows(&ctx.store, "exercise").await, 1);
        assert_eq!(ctx.store.tables().await.unwrap(), vec!["exercise"]);
    }

    #[tokio::test]
    async fn test_composite_key_fields_errors() {
        let ctx = setup_with_exercise().await;

        match ctx.store.get_composite_key_fields("workout_log").await {
            Err(StoreError::TableNotFound { table, available }) => {
                assert_eq!(table, "workout_log");
                assert_eq!(available, vec!["exercise"]);
            }
            other => panic!("expected TableNotFound, got {:?}", other),
        }

        sqlx::query("DELETE FROM metadata WHERE table_name = 'exercise'")
            .execute(&ctx.store.pool)
            .await
            .unwrap();

        assert!(matches!(
            ctx.store.get_composite_key_fields("exercise").await,
            Err(StoreError::MetadataNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_then_add_again_is_duplicate() {
        let ctx = setup_with_exercise().await;
        let squat = exercise("e1", "Squat");

        let first = ctx.store.add("exercise", squat.clone()).await.unwrap();
        assert_eq!(first.inserted, vec![squat.clone()]);
        assert!(first.duplicates.is_empty());
        assert_eq!(ctx.store.count("exercise").await.unwrap(), 1);
        assert_eq!(placeholder_rows(&ctx.store, "exercise").await, 0);

        let second = ctx.store.add("exercise", squat.clone()).await.unwrap();
        assert!(second.inserted.is_empty());
        assert_eq!(second.duplicates, vec![squat]);
        assert_eq!(ctx.store.count("exercise").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_batch_first_occurrence_wins() {
        let ctx = setup_with_exercise().await;

        let batch = vec![
            exercise("e1", "Squat"),
            exercise("e2", "Bench"),
            exercise("e1", "Squat (again)"),
            record_from(json!({"name": "No id"})),
        ];
        let partition = ctx.store.add("exercise", batch).await.unwrap();

        assert_eq!(partition.inserted.len(), 2);
        assert_eq!(partition.duplicates, vec![exercise("e1", "Squat (again)")]);
        assert_eq!(partition.failed.len(), 1);

        let stored = ctx.store.all("exercise").await.unwrap();
        assert_eq!(stored[0]["name"], "Squat");
        assert_eq!(stored[1]["name"], "Bench");
    }

    #[tokio::test]
    async fn test_add_keeps_keys_unique_across_batches() {
        let ctx = setup().await;
        ctx.store
            .create_table("workout_log", Shape::CompletedSet, None)
            .await
            .unwrap();

        for batch in [
            vec![set("2025-05-07", 1, "sq"), set("2025-05-07", 2, "sq")],
            vec![set("2025-05-07", 2, "sq"), set("2025-05-08", 1, "sq")],
            vec![set("2025-05-08", 1, "sq"), set("2025-05-07", 1, "bp")],
        ] {
            ctx.store.add("workout_log", batch).await.unwrap();
        }

        let key_fields = ctx.store.get_composite_key_fields("workout_log").await.unwrap();
        let stored = ctx.store.all("workout_log").await.unwrap();
        let keys: HashSet<String> = stored
            .iter()
            .map(|record| build_key(&key_fields, record).unwrap())
            .collect();

        assert_eq!(stored.len(), 4);
        assert_eq!(keys.len(), stored.len());
    }

    #[tokio::test]
    async fn test_add_updates_timestamp_only_when_inserting() {
        let ctx = setup_with_exercise().await;
        let created = ctx.store.metadata("exercise").await.unwrap().updated_at;

        ctx.store.add("exercise", exercise("e1", "Squat")).await.unwrap();
        let after_insert = ctx.store.metadata("exercise").await.unwrap().updated_at;
        assert!(after_insert >= created);

        ctx.store.add("exercise", exercise("e1", "Squat")).await.unwrap();
        let after_duplicate = ctx.store.metadata("exercise").await.unwrap().updated_at;
        assert_eq!(after_duplicate, after_insert);
    }

    #[tokio::test]
    async fn test_add_failures_keep_placeholder() {
        let ctx = setup_with_exercise().await;

        let partition = ctx
            .store
            .add("exercise", record_from(json!({"name": "No id"})))
            .await
            .unwrap();

        assert_eq!(partition.failed.len(), 1);
        assert_eq!(placeholder_rows(&ctx.store, "exercise").await, 1);
    }

    #[tokio::test]
    async fn test_add_empty_input_is_noop() {
        let ctx = setup_with_exercise().await;

        let partition = ctx.store.add("exercise", Vec::<Record>::new()).await.unwrap();
        assert!(partition.is_empty());
        assert_eq!(placeholder_rows(&ctx.store, "exercise").await, 1);
    }

    #[tokio::test]
    async fn test_add_to_unregistered_table() {
        let ctx = setup().await;

        assert!(matches!(
            ctx.store.add("exercise", exercise("e1", "Squat")).await,
            Err(StoreError::MetadataNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_matching_record() {
        let ctx = setup_with_exercise().await;
        ctx.store.add("exercise", exercise("e1", "Squat")).await.unwrap();

        let mut stamped = exercise("e1", "Squat");
        stamped.insert("page_id".to_string(), json!("page-1"));

        let updated = ctx.store.update("exercise", &stamped).await.unwrap();
        assert_eq!(updated, Some(stamped.clone()));

        let stored = ctx
            .store
            .get("exercise", &record_from(json!({"id": "e1"})))
            .await
            .unwrap();
        assert_eq!(stored, vec![stamped]);
    }

    #[tokio::test]
    async fn test_update_missing_record_returns_none() {
        let ctx = setup_with_exercise().await;

        let result = ctx.store.update("exercise", &exercise("e9", "Row")).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_and_keyless_records() {
        let ctx = setup_with_exercise().await;

        assert!(matches!(
            ctx.store.update("exercise", &Record::new()).await,
            Err(StoreError::Database(_))
        ));
        assert!(matches!(
            ctx.store
                .update("exercise", &record_from(json!({"name": "Squat"})))
                .await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let ctx = setup().await;
        ctx.store
            .create_table("workout_log", Shape::CompletedSet, None)
            .await
            .unwrap();
        ctx.store
            .add(
                "workout_log",
                vec![set("2025-05-07", 1, "sq"), set("2025-05-07", 2, "sq")],
            )
            .await
            .unwrap();

        let key = record_from(json!({"date": "2025-05-07", "set_number": 2, "exercise_id": "sq"}));
        assert_eq!(ctx.store.get("workout_log", &key).await.unwrap().len(), 1);

        assert!(ctx.store.delete("workout_log", &key).await.unwrap());
        assert!(!ctx.store.delete("workout_log", &key).await.unwrap());
        assert!(ctx.store.get("workout_log", &key).await.unwrap().is_empty());
        assert_eq!(ctx.store.count("workout_log").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_null_key_value() {
        let ctx = setup_with_exercise().await;

        assert!(matches!(
            ctx.store
                .delete("exercise", &record_from(json!({"id": null})))
                .await,
            Err(StoreError::CompositeKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_new_entries_returns_local_only() {
        let ctx = setup_with_exercise().await;
        ctx.store
            .add(
                "exercise",
                vec![exercise("e1", "Squat"), exercise("e2", "Bench")],
            )
            .await
            .unwrap();

        let remote = vec![record_from(json!({"id": "e1"}))];
        let new_entries = ctx.store.get_new_entries(&remote, "exercise").await.unwrap();

        assert_eq!(new_entries, vec![exercise("e2", "Bench")]);
    }

    #[tokio::test]
    async fn test_last_sync_time_round_trip() {
        let ctx = setup_with_exercise().await;
        assert_eq!(ctx.store.get_last_sync_time("exercise").await.unwrap(), None);

        let now = Utc::now();
        let stored = ctx
            .store
            .update_last_sync_time("exercise", now)
            .await
            .unwrap();
        assert_eq!(stored, Some(now));
        assert_eq!(
            ctx.store.get_last_sync_time("exercise").await.unwrap(),
            Some(now)
        );
    }

    #[tokio::test]
    async fn test_last_sync_time_never_moves_backwards() {
        let ctx = setup_with_exercise().await;
        let now = Utc::now();

        ctx.store.update_last_sync_time("exercise", now).await.unwrap();
        let stored = ctx
            .store
            .update_last_sync_time("exercise", now - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(stored, Some(now));
    }

    #[tokio::test]
    async fn test_last_sync_time_errors() {
        let ctx = setup_with_exercise().await;

        assert!(matches!(
            ctx.store.get_last_sync_time("workout_log").await,
            Err(StoreError::TableNotFound { .. })
        ));

        sqlx::query("DELETE FROM metadata")
            .execute(&ctx.store.pool)
            .await
            .unwrap();

        assert!(matches!(
            ctx.store.get_last_sync_time("exercise").await,
            Err(StoreError::MetadataNotFound(_))
        ));
        assert_eq!(
            ctx.store
                .update_last_sync_time("exercise", Utc::now())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_backup_writes_readable_snapshot() {
        let ctx = setup_with_exercise().await;
        ctx.store.add("exercise", exercise("e1", "Squat")).await.unwrap();

        let backup_dir = ctx._temp_dir.path().join("backups");
        let first = ctx.store.backup(&backup_dir).await.unwrap();
        let second = ctx.store.backup(&backup_dir).await.unwrap();

        assert_ne!(first, second);
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("database_backup_"));

        let restored = RecordStore::open(&first).await.unwrap();
        assert_eq!(restored.count("exercise").await.unwrap(), 1);
    }
}
