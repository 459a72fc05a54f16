use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::notion;
use super::KeyedModel;
use crate::error::SchemaError;

/// An exercise definition from the exercise library database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Remote page id of the definition.
    pub id: String,
    pub name: String,
    pub category: String,
    pub equipment: String,
    pub force: String,
    pub level: String,
    pub mechanic: String,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
}

const UNNAMED: &str = "Unnamed Exercise";

impl KeyedModel for Exercise {
    fn composite_key() -> &'static [&'static str] {
        &["id"]
    }

    fn descriptor() -> Value {
        json!({
            "title": "Exercise",
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "name": {"type": "string"},
                "category": {"type": "string"},
                "equipment": {"type": "string"},
                "force": {"type": "string"},
                "level": {"type": "string"},
                "mechanic": {"type": "string"},
                "primary_muscles": {"type": "array", "items": {"type": "string"}},
                "secondary_muscles": {"type": "array", "items": {"type": "string"}}
            },
            "required": [
                "id", "name", "category", "equipment", "force", "level",
                "mechanic", "primary_muscles", "secondary_muscles"
            ]
        })
    }

    fn map_page(page: &Value) -> Result<Value, SchemaError> {
        let props = notion::properties(page)?;
        let select = |name: &str| notion::select_name(props.get(name)).unwrap_or_default();

        Ok(json!({
            "id": notion::page_id(page),
            "name": notion::title(props.get("Name")).unwrap_or_else(|| UNNAMED.to_string()),
            "category": select("Category"),
            "equipment": select("Equipment"),
            "force": select("Force"),
            "level": select("Level"),
            "mechanic": select("Mechanic"),
            "primary_muscles": notion::multi_select_names(props.get("Primary Muscles")),
            "secondary_muscles": notion::multi_select_names(props.get("Secondary Muscles")),
        }))
    }

    fn to_properties(&self) -> Value {
        json!({
            "Name": notion::title_value(&self.name),
            "Category": notion::select_value(&self.category),
            "Equipment": notion::select_value(&self.equipment),
            "Force": notion::select_value(&self.force),
            "Level": notion::select_value(&self.level),
            "Mechanic": notion::select_value(&self.mechanic),
            "Primary Muscles": notion::multi_select_value(&self.primary_muscles),
            "Secondary Muscles": notion::multi_select_value(&self.secondary_muscles),
        })
    }
}
