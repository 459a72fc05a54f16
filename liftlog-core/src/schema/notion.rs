//! Reading and writing Notion page property values.
//!
//! Readers take the property object (`props["Name"]`) and are lenient: a
//! missing property or a property of another type yields `None` or an empty
//! value, and the typed model decides whether that is acceptable.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Returns the `properties` object of a page.
///
/// A page without properties maps to an empty object; a page that is not an
/// object, or whose properties are not an object, cannot be mapped.
pub fn properties(page: &Value) -> Result<&Map<String, Value>, SchemaError> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    let page_obj = page.as_object().ok_or_else(|| SchemaError::Parsing {
        message: "Remote document is not an object".to_string(),
        context: json!({ "data": page }),
    })?;

    match page_obj.get("properties") {
        None | Some(Value::Null) => Ok(EMPTY.get_or_init(Map::new)),
        Some(Value::Object(props)) => Ok(props),
        Some(_) => Err(SchemaError::Parsing {
            message: "Remote document properties are not an object".to_string(),
            context: json!({ "data": page }),
        }),
    }
}

/// The page's own id.
pub fn page_id(page: &Value) -> Option<&str> {
    page.get("id").and_then(Value::as_str)
}

pub fn select_name(prop: Option<&Value>) -> Option<&str> {
    prop?.get("select")?.get("name")?.as_str()
}

pub fn multi_select_names(prop: Option<&Value>) -> Vec<String> {
    prop.and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Raw `number` value, which may be JSON null.
pub fn number(prop: Option<&Value>) -> Value {
    prop.and_then(|p| p.get("number"))
        .cloned()
        .unwrap_or(Value::Null)
}

pub fn date_start(prop: Option<&Value>) -> Option<&str> {
    prop?.get("date")?.get("start")?.as_str()
}

pub fn first_relation_id(prop: Option<&Value>) -> Option<&str> {
    prop?.get("relation")?.as_array()?.first()?.get("id")?.as_str()
}

/// Content of the first text block. Newlines are flattened to spaces.
pub fn rich_text(prop: Option<&Value>) -> String {
    first_text_content(prop, "rich_text")
        .map(|text| text.replace('\n', " "))
        .unwrap_or_default()
}

pub fn title(prop: Option<&Value>) -> Option<String> {
    first_text_content(prop, "title").map(str::to_string)
}

fn first_text_content<'a>(prop: Option<&'a Value>, kind: &str) -> Option<&'a str> {
    prop?
        .get(kind)?
        .as_array()?
        .first()?
        .get("text")?
        .get("content")?
        .as_str()
}

pub fn title_value(content: &str) -> Value {
    json!({ "title": [{ "text": { "content": content } }] })
}

pub fn rich_text_value(content: &str) -> Value {
    if content.is_empty() {
        return json!({ "rich_text": [] });
    }
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

/// Select property; an empty name clears the select.
pub fn select_value(name: &str) -> Value {
    if name.is_empty() {
        return json!({ "select": null });
    }
    json!({ "select": { "name": name } })
}

pub fn multi_select_value(names: &[String]) -> Value {
    let items: Vec<Value> = names.iter().map(|name| json!({ "name": name })).collect();
    json!({ "multi_select": items })
}

pub fn number_value<T: Serialize>(number: T) -> Value {
    json!({ "number": number })
}

pub fn date_value(start: &str) -> Value {
    json!({ "date": { "start": start } })
}

pub fn relation_value(id: &str) -> Value {
    json!({ "relation": [{ "id": id }] })
}

/// Summary of a remote database object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCollectionInfo {
    pub id: Option<String>,
    pub title: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    pub properties: Value,
}

pub fn parse_database_info(data: &Value) -> RemoteCollectionInfo {
    let str_field = |name: &str| data.get(name).and_then(Value::as_str).map(str::to_string);

    RemoteCollectionInfo {
        id: str_field("id"),
        title: data
            .get("title")
            .and_then(Value::as_array)
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.get("text"))
            .and_then(|text| text.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_time: str_field("created_time"),
        last_edited_time: str_field("last_edited_time"),
        properties: data.get("properties").cloned().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_rejects_non_object_page() {
        assert!(matches!(
            properties(&json!("not a page")),
            Err(SchemaError::Parsing { .. })
        ));
        assert!(matches!(
            properties(&json!({"properties": [1, 2]})),
            Err(SchemaError::Parsing { .. })
        ));
    }

    #[test]
    fn test_properties_missing_is_empty() {
        assert!(properties(&json!({"id": "p1"})).unwrap().is_empty());
    }

    #[test]
    fn test_rich_text_flattens_newlines() {
        let prop = json!({"rich_text": [{"text": {"content": "slow\neccentric"}}]});
        assert_eq!(rich_text(Some(&prop)), "slow eccentric");
        assert_eq!(rich_text(None), "");
    }

    #[test]
    fn test_readers_tolerate_wrong_types() {
        let prop = json!({"number": 5});
        assert_eq!(select_name(Some(&prop)), None);
        assert_eq!(first_relation_id(Some(&json!({"relation": []}))), None);
        assert!(multi_select_names(Some(&prop)).is_empty());
    }

    #[test]
    fn test_select_value_clears_on_empty() {
        assert_eq!(select_value(""), json!({"select": null}));
        assert_eq!(select_name(Some(&select_value("Barbell"))), Some("Barbell"));
    }

    #[test]
    fn test_parse_database_info() {
        let data = json!({
            "id": "db-1",
            "title": [{"text": {"content": "Workout Log"}}],
            "created_time": "2025-01-01T00:00:00.000Z",
            "last_edited_time": "2025-05-07T10:00:00.000Z",
            "properties": {"Date": {"type": "date"}}
        });

        let info = parse_database_info(&data);
        assert_eq!(info.id.as_deref(), Some("db-1"));
        assert_eq!(info.title, "Workout Log");
        assert_eq!(
            info.last_edited_time.as_deref(),
            Some("2025-05-07T10:00:00.000Z")
        );
    }
}
