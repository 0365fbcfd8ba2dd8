use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as JsonValue};

/// A single primitive cell value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// String form used for searching, filtering and tab matching.
    /// `Null` has no string form and therefore never matches anything.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Array(items) => Value::Text(
                items
                    .iter()
                    .map(|item| match item {
                        JsonValue::String(s) => s.clone(),
                        other => Value::from_json(other)
                            .as_text()
                            .unwrap_or_else(|| other.to_string()),
                    })
                    .collect::<Vec<String>>()
                    .join(", "),
            ),
            JsonValue::Object(_) => Value::Text(value.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(s) => write!(f, "{}", s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
            None => write!(f, "∅"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A flat, immutable snapshot of one item of a collection.
///
/// Field lookups never fail: an absent field and a `Null` field both
/// resolve to `None` in [`Record::text`], which the engine treats as
/// "does not match".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert, mostly handy in tests and fixtures.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Value::as_text)
    }

    /// Lower cased string form of a field, `None` for absent and null fields.
    pub fn folded(&self, field: &str) -> Option<String> {
        self.text(field).map(|s| s.to_lowercase())
    }

    pub fn display(&self, field: &str) -> String {
        self.get(field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| String::from("∅"))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Build a record from a JSON object. Nested objects are flattened into
    /// dotted keys (`address.city`), arrays become a comma separated string.
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Self {
        let mut record = Record::new();
        record.flatten_into("", object);
        record
    }

    fn flatten_into(&mut self, prefix: &str, object: &Map<String, JsonValue>) {
        for (key, value) in object {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                JsonValue::Object(inner) => self.flatten_into(&name, inner),
                other => {
                    self.fields.insert(name, Value::from_json(other));
                }
            }
        }
    }
}

/// Quote a cell for CSV output when it contains separators or quotes.
pub fn wrap_csv_cell(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_fields_have_no_text() {
        let record = Record::new().with("name", "John").with("nick", Value::Null);
        assert_eq!(record.text("name").as_deref(), Some("John"));
        assert_eq!(record.text("nick"), None);
        assert_eq!(record.text("missing"), None);
        assert_eq!(record.display("missing"), "∅");
    }

    #[test]
    fn numbers_stringify_like_the_api_prints_them() {
        let record = Record::new()
            .with("id", 7_i64)
            .with("price", 9.99)
            .with("weight", 10.0);
        assert_eq!(record.text("id").as_deref(), Some("7"));
        assert_eq!(record.text("price").as_deref(), Some("9.99"));
        assert_eq!(record.text("weight").as_deref(), Some("10"));
    }

    #[test]
    fn nested_json_is_flattened() {
        let raw = json!({
            "id": 1,
            "firstName": "Emily",
            "hair": { "color": "Brown", "type": "Curly" },
            "address": { "city": "Phoenix", "coordinates": { "lat": 1.5 } },
            "tags": ["beauty", "mascara"],
            "maidenName": null
        });
        let record = Record::from_json_object(raw.as_object().unwrap());

        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert_eq!(record.text("hair.color").as_deref(), Some("Brown"));
        assert_eq!(record.text("address.coordinates.lat").as_deref(), Some("1.5"));
        assert_eq!(record.text("tags").as_deref(), Some("beauty, mascara"));
        assert!(record.get("maidenName").unwrap().is_null());
        assert!(record.get("hair").is_none());
    }

    #[test]
    fn folded_lowercases() {
        let record = Record::new().with("gender", "Male");
        assert_eq!(record.folded("gender").as_deref(), Some("male"));
    }

    #[test]
    fn csv_cells_are_quoted_when_needed() {
        assert_eq!(wrap_csv_cell("plain"), "plain");
        assert_eq!(wrap_csv_cell("a b"), "\"a b\"");
        assert_eq!(wrap_csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
