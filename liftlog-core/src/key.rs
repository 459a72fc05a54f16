//! Composite key derivation.
//!
//! A record's identity is the ordered concatenation of its key-field values.
//! Strings are taken verbatim; every other value uses its compact JSON form.
//! A missing or null key field is always an error, never a default.

use serde_json::Value;

use crate::error::StoreError;
use crate::record::Record;

/// Separator placed between key-field values.
pub const KEY_SEPARATOR: &str = "_";

/// Builds the composite key string of `record` for the given key fields.
pub fn build_key<S: AsRef<str>>(key_fields: &[S], record: &Record) -> Result<String, StoreError> {
    let missing: Vec<String> = key_fields
        .iter()
        .map(|field| field.as_ref())
        .filter(|field| record.get(*field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(StoreError::CompositeKey {
            missing,
            entry_keys: record.keys().cloned().collect(),
        });
    }

    let parts: Vec<String> = key_fields
        .iter()
        .filter_map(|field| record.get(field.as_ref()))
        .map(stringify)
        .collect();

    Ok(parts.join(KEY_SEPARATOR))
}

/// Returns true if `record` carries every field of `key_values` with an equal value.
///
/// Fails if any value in `key_values` is null.
pub fn key_matches(record: &Record, key_values: &Record) -> Result<bool, StoreError> {
    let nulls: Vec<String> = key_values
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(field, _)| field.clone())
        .collect();
    if !nulls.is_empty() {
        return Err(StoreError::CompositeKey {
            missing: nulls,
            entry_keys: key_values.keys().cloned().collect(),
        });
    }

    Ok(key_values
        .iter()
        .all(|(field, value)| record.get(field) == Some(value)))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from;
    use serde_json::json;

    const SET_KEY: [&str; 3] = ["date", "set_number", "exercise_id"];

    #[test]
    fn test_build_key_joins_in_declared_order() {
        let record = record_from(json!({
            "exercise_id": "ex-1",
            "date": "2025-05-07",
            "set_number": 2,
            "reps": 8,
        }));

        assert_eq!(build_key(&SET_KEY, &record).unwrap(), "2025-05-07_2_ex-1");
    }

    #[test]
    fn test_build_key_names_missing_fields() {
        let record = record_from(json!({"date": "2025-05-07"}));

        match build_key(&SET_KEY, &record) {
            Err(StoreError::CompositeKey {
                missing,
                entry_keys,
            }) => {
                assert_eq!(missing, vec!["set_number", "exercise_id"]);
                assert_eq!(entry_keys, vec!["date"]);
            }
            other => panic!("expected CompositeKey error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_key_field_is_missing() {
        let record = record_from(json!({"id": null, "name": "Squat"}));
        assert!(build_key(&["id"], &record).is_err());
    }

    #[test]
    fn test_non_key_fields_do_not_affect_identity() {
        let a = record_from(json!({"id": "e1", "name": "Squat"}));
        let b = record_from(json!({"id": "e1", "name": "Back Squat"}));
        assert_eq!(build_key(&["id"], &a).unwrap(), build_key(&["id"], &b).unwrap());
    }

    #[test]
    fn test_key_matches() {
        let record = record_from(json!({"id": "e1", "name": "Squat"}));
        assert!(key_matches(&record, &record_from(json!({"id": "e1"}))).unwrap());
        assert!(!key_matches(&record, &record_from(json!({"id": "e2"}))).unwrap());
        assert!(key_matches(&record, &record_from(json!({"id": null}))).is_err());
    }
}
