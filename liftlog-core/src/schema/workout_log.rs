use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::notion;
use super::KeyedModel;
use crate::error::SchemaError;

/// A completed set recorded in the workout log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub workout_name: String,
    pub exercise_id: String,
    pub set_number: i64,
    #[serde(default)]
    pub weight: Option<f64>,
    pub reps: i64,
    /// ISO date (or date-time) the set was performed.
    pub date: String,
    /// Remote page id, set once the set exists remotely.
    #[serde(default)]
    pub page_id: Option<String>,
    pub exercise_notes: String,
}

impl KeyedModel for CompletedSet {
    fn composite_key() -> &'static [&'static str] {
        &["date", "set_number", "exercise_id"]
    }

    fn descriptor() -> Value {
        json!({
            "title": "CompletedSet",
            "type": "object",
            "properties": {
                "workout_name": {"type": "string"},
                "exercise_id": {"type": "string"},
                "set_number": {"type": "integer"},
                "weight": {"anyOf": [{"type": "number"}, {"type": "null"}], "default": null},
                "reps": {"type": "integer"},
                "date": {"type": "string"},
                "page_id": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null},
                "exercise_notes": {"type": "string"}
            },
            "required": ["workout_name", "exercise_id", "set_number", "reps", "date", "exercise_notes"]
        })
    }

    fn map_page(page: &Value) -> Result<Value, SchemaError> {
        let props = notion::properties(page)?;

        Ok(json!({
            "workout_name": notion::select_name(props.get("Workout Title")).unwrap_or_default(),
            "weight": notion::number(props.get("Weight")),
            "reps": notion::number(props.get("Reps")),
            "exercise_id": notion::first_relation_id(props.get("Exercise Reference")),
            "set_number": notion::number(props.get("Set #")),
            "date": notion::date_start(props.get("Date")),
            "page_id": notion::page_id(page),
            "exercise_notes": notion::rich_text(props.get("Notes")),
        }))
    }

    fn to_properties(&self) -> Value {
        json!({
            "Date": notion::date_value(&self.date),
            "Set #": notion::number_value(self.set_number),
            "Reps": notion::number_value(self.reps),
            "Weight": notion::number_value(self.weight),
            "Exercise Reference": notion::relation_value(&self.exercise_id),
            "Workout Title": notion::select_value(&self.workout_name),
            "Notes": notion::rich_text_value(&self.exercise_notes),
        })
    }
}
