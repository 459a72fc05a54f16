//! Untyped records and the result of partitioning an insert batch.

use serde::Serialize;
use serde_json::{Map, Value};

/// One synchronized entity: field name to scalar or nested value.
pub type Record = Map<String, Value>;

/// Input to [`RecordStore::add`](crate::store::RecordStore::add): one record
/// or a batch.
#[derive(Debug, Clone, Default)]
pub struct Records(pub Vec<Record>);

impl From<Record> for Records {
    fn from(record: Record) -> Self {
        Records(vec![record])
    }
}

impl From<Vec<Record>> for Records {
    fn from(records: Vec<Record>) -> Self {
        Records(records)
    }
}

impl From<&[Record]> for Records {
    fn from(records: &[Record]) -> Self {
        Records(records.to_vec())
    }
}

/// Disjoint split of an insert batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partition {
    /// Records whose key was not yet known (first occurrence wins).
    pub inserted: Vec<Record>,
    /// Records whose key already existed in storage or earlier in the batch.
    pub duplicates: Vec<Record>,
    /// Records missing one or more composite key fields.
    pub failed: Vec<Record>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.duplicates.is_empty() && self.failed.is_empty()
    }
}

/// Builds a record from a JSON object literal. Non-objects yield an empty record.
pub fn record_from(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
