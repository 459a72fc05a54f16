//! Schema registry: which record shape each collection holds, and how a
//! shape maps to and from remote page properties.
//!
//! The registry is the static [`Shape`] enum. Each shape is backed by a typed
//! model implementing [`KeyedModel`], which declares the model's composite key
//! and its field mapping.

mod exercise;
pub mod notion;
mod workout_log;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::SchemaError;
use crate::record::{record_from, Record};

pub use exercise::Exercise;
pub use notion::{parse_database_info, RemoteCollectionInfo};
pub use workout_log::CompletedSet;

/// Field on a local record holding the id of its remote document.
pub const REMOTE_ID_FIELD: &str = "page_id";

/// A typed record shape with a declared identity.
pub trait KeyedModel: Serialize + DeserializeOwned {
    /// Ordered identity field names.
    fn composite_key() -> &'static [&'static str];

    /// Shape descriptor persisted in collection metadata.
    fn descriptor() -> Value;

    /// Maps a raw page onto the model's field layout without validating it.
    fn map_page(page: &Value) -> Result<Value, SchemaError>;

    /// Remote page properties for this value.
    fn to_properties(&self) -> Value;

    /// Maps and validates a raw page.
    fn from_page(page: &Value) -> Result<Self, SchemaError> {
        let mapped = Self::map_page(page)?;
        serde_json::from_value(mapped.clone()).map_err(|e| SchemaError::Model {
            message: "Parsed page did not match model schema".to_string(),
            context: json!({ "data": mapped, "error": e.to_string() }),
        })
    }
}

/// Record shapes known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Exercise,
    CompletedSet,
}

impl Shape {
    pub const ALL: [Shape; 2] = [Shape::Exercise, Shape::CompletedSet];

    /// Looks up the shape registered for a collection name.
    pub fn for_collection(name: &str) -> Option<Shape> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.collection_name() == name)
    }

    /// Collection the shape is registered under.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Shape::Exercise => "exercise",
            Shape::CompletedSet => "workout_log",
        }
    }

    pub fn composite_key(&self) -> &'static [&'static str] {
        match self {
            Shape::Exercise => Exercise::composite_key(),
            Shape::CompletedSet => CompletedSet::composite_key(),
        }
    }

    pub fn remote_id_field(&self) -> &'static str {
        REMOTE_ID_FIELD
    }

    pub fn descriptor(&self) -> Value {
        match self {
            Shape::Exercise => Exercise::descriptor(),
            Shape::CompletedSet => CompletedSet::descriptor(),
        }
    }

    /// Converts a raw remote page into a record of this shape.
    pub fn normalize(&self, page: &Value) -> Result<Record, SchemaError> {
        match self {
            Shape::Exercise => normalize_as::<Exercise>(page),
            Shape::CompletedSet => normalize_as::<CompletedSet>(page),
        }
    }

    /// Normalizes a full fetch. The first failure fails the whole batch.
    pub fn normalize_all(&self, pages: &[Value]) -> Result<Vec<Record>, SchemaError> {
        pages.iter().map(|page| self.normalize(page)).collect()
    }

    /// Remote id of a raw document.
    pub fn document_id(page: &Value) -> Option<&str> {
        notion::page_id(page)
    }

    /// Remote id stamped on a local record, if any.
    pub fn linked_remote_id<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record.get(self.remote_id_field()).and_then(Value::as_str)
    }

    /// Converts a record into remote page properties.
    pub fn encode(&self, record: &Record) -> Result<Value, SchemaError> {
        match self {
            Shape::Exercise => encode_as::<Exercise>(record),
            Shape::CompletedSet => encode_as::<CompletedSet>(record),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection_name())
    }
}

fn normalize_as<M: KeyedModel>(page: &Value) -> Result<Record, SchemaError> {
    let model = M::from_page(page)?;
    to_record(&model)
}

fn encode_as<M: KeyedModel>(record: &Record) -> Result<Value, SchemaError> {
    let model: M = serde_json::from_value(Value::Object(record.clone())).map_err(|e| {
        SchemaError::Model {
            message: "Record did not match model schema".to_string(),
            context: json!({ "data": record, "error": e.to_string() }),
        }
    })?;
    Ok(model.to_properties())
}

fn to_record<M: KeyedModel>(model: &M) -> Result<Record, SchemaError> {
    serde_json::to_value(model)
        .map(record_from)
        .map_err(|e| SchemaError::Parsing {
            message: "Failed to serialize model".to_string(),
            context: json!({ "error": e.to_string() }),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_record() -> Record {
        record_from(json!({
            "workout_name": "Leg Day",
            "exercise_id": "page-squat",
            "set_number": 1,
            "weight": 100.0,
            "reps": 5,
            "date": "2025-05-07",
            "page_id": "page-1",
            "exercise_notes": "",
        }))
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!(Shape::for_collection("exercise"), Some(Shape::Exercise));
        assert_eq!(
            Shape::for_collection("workout_log"),
            Some(Shape::CompletedSet)
        );
        assert_eq!(Shape::for_collection("meals"), None);
    }

    #[test]
    fn test_composite_keys() {
        assert_eq!(Shape::Exercise.composite_key(), &["id"]);
        assert_eq!(
            Shape::CompletedSet.composite_key(),
            &["date", "set_number", "exercise_id"]
        );
    }

    #[test]
    fn test_descriptor_lists_key_fields() {
        for shape in Shape::ALL {
            let descriptor = shape.descriptor();
            for field in shape.composite_key() {
                assert!(
                    descriptor["properties"].get(*field).is_some(),
                    "{} descriptor lacks {}",
                    shape,
                    field
                );
            }
        }
    }

    #[test]
    fn test_record_round_trip() {
        let record = set_record();
        let properties = Shape::CompletedSet.encode(&record).unwrap();
        let page = json!({"id": "page-1", "properties": properties});

        assert_eq!(Shape::CompletedSet.normalize(&page).unwrap(), record);
    }

    #[test]
    fn test_document_round_trip() {
        let page = json!({
            "id": "page-bench",
            "properties": {
                "Name": {"title": [{"text": {"content": "Bench Press"}}]},
                "Category": {"select": {"name": "strength"}},
                "Equipment": {"select": {"name": "barbell"}},
                "Force": {"select": {"name": "push"}},
                "Level": {"select": {"name": "beginner"}},
                "Mechanic": {"select": {"name": "compound"}},
                "Primary Muscles": {"multi_select": [{"name": "chest"}]},
                "Secondary Muscles": {"multi_select": [{"name": "triceps"}]}
            }
        });

        let record = Shape::Exercise.normalize(&page).unwrap();
        let encoded = Shape::Exercise.encode(&record).unwrap();
        assert_eq!(encoded, page["properties"]);
    }

    #[test]
    fn test_encode_ignores_stamped_remote_id() {
        let mut record = record_from(json!({
            "id": "local-1", "name": "Curl", "category": "", "equipment": "",
            "force": "", "level": "", "mechanic": "",
            "primary_muscles": [], "secondary_muscles": []
        }));
        record.insert(REMOTE_ID_FIELD.to_string(), json!("page-9"));

        assert!(Shape::Exercise.encode(&record).is_ok());
    }

    #[test]
    fn test_encode_rejects_incomplete_record() {
        let record = record_from(json!({"id": "e1"}));
        assert!(matches!(
            Shape::Exercise.encode(&record),
            Err(SchemaError::Model { .. })
        ));
    }

    #[test]
    fn test_normalize_all_fails_on_first_bad_page() {
        let pages = vec![json!({"id": "p1", "properties": {}}), json!(42)];
        assert!(matches!(
            Shape::Exercise.normalize_all(&pages),
            Err(SchemaError::Parsing { .. })
        ));
    }
}
