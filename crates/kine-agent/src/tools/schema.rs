//! Tool input/output schemas.
//!
//! A small tagged tree that serves two purposes: generating example payloads
//! for the system prompt, and validating tool inputs and outputs at dispatch
//! time. Validation returns a normalised copy of the value with defaults
//! filled in and unknown object keys dropped.

use serde_json::{Map, Value};

// ─────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    /// Accepts anything, including a missing value.
    Any,
    String,
    Number,
    Integer,
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    Array(Box<Schema>),
    /// Ordered fields.
    Object(Vec<(String, Schema)>),
    Optional(Box<Schema>),
    /// Inner schema with a value used when the field is missing.
    Default(Box<Schema>, Value),
    Described(Box<Schema>, String),
}

/// Validation failure with the path of the offending value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_error(.path, .message))]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

fn render_error(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_string()
    } else {
        format!("{path}: {message}")
    }
}

impl SchemaError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl Schema {
    // ── Constructors ──

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Schema::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    pub fn array(item: Schema) -> Self {
        Schema::Array(Box::new(item))
    }

    pub fn enumeration<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        Schema::Enum(options.into_iter().map(Into::into).collect())
    }

    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    pub fn with_default(self, value: Value) -> Self {
        Schema::Default(Box::new(self), value)
    }

    pub fn describe(self, text: impl Into<String>) -> Self {
        Schema::Described(Box::new(self), text.into())
    }

    // ── Examples ──

    /// A representative value, used in the tool listing shown to the model.
    pub fn example(&self) -> Value {
        match self {
            Schema::Any => Value::Null,
            Schema::String => Value::String("string".to_string()),
            Schema::Number | Schema::Integer => Value::from(0),
            Schema::Boolean => Value::Bool(true),
            Schema::Enum(options) => options
                .first()
                .map(|o| Value::String(o.clone()))
                .unwrap_or(Value::Null),
            Schema::Array(item) => Value::Array(vec![item.example()]),
            Schema::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.example()))
                    .collect(),
            ),
            Schema::Optional(inner) | Schema::Described(inner, _) => inner.example(),
            Schema::Default(_, value) => value.clone(),
        }
    }

    // ── Validation ──

    /// Validate `value`, returning the normalised value.
    pub fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        self.check(Some(value), "").map(|v| v.unwrap_or(Value::Null))
    }

    /// `None` input means the field was absent; `None` output means it stays absent.
    fn check(&self, value: Option<&Value>, path: &str) -> Result<Option<Value>, SchemaError> {
        match self {
            Schema::Described(inner, _) => inner.check(value, path),
            Schema::Optional(inner) => match value {
                None => Ok(None),
                Some(v) => inner.check(Some(v), path),
            },
            Schema::Default(inner, default) => match value {
                None => Ok(Some(default.clone())),
                Some(v) => inner.check(Some(v), path),
            },
            Schema::Any => Ok(value.cloned()),
            _ => {
                let value = value.ok_or_else(|| SchemaError::new(path, "Required"))?;
                self.check_present(value, path).map(Some)
            }
        }
    }

    fn check_present(&self, value: &Value, path: &str) -> Result<Value, SchemaError> {
        match self {
            Schema::String => match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(type_error(path, "string", other)),
            },
            Schema::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                other => Err(type_error(path, "number", other)),
            },
            Schema::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::Number(n) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => {
                    Ok(value.clone())
                }
                Value::Number(_) => Err(SchemaError::new(path, "Expected integer, received float")),
                other => Err(type_error(path, "integer", other)),
            },
            Schema::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                other => Err(type_error(path, "boolean", other)),
            },
            Schema::Enum(options) => {
                let expected = options
                    .iter()
                    .map(|o| format!("'{o}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                match value {
                    Value::String(s) if options.iter().any(|o| o == s) => Ok(value.clone()),
                    Value::String(s) => Err(SchemaError::new(
                        path,
                        format!("Invalid enum value. Expected {expected}, received '{s}'"),
                    )),
                    other => Err(type_error(path, &expected, other)),
                }
            }
            Schema::Array(item) => match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        item.check(Some(v), &format!("{path}[{i}]"))
                            .map(|v| v.unwrap_or(Value::Null))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(type_error(path, "array", other)),
            },
            Schema::Object(fields) => match value {
                Value::Object(map) => {
                    let mut out = Map::new();
                    for (name, schema) in fields {
                        let field_path = if path.is_empty() {
                            name.clone()
                        } else {
                            format!("{path}.{name}")
                        };
                        if let Some(v) = schema.check(map.get(name), &field_path)? {
                            out.insert(name.clone(), v);
                        }
                    }
                    Ok(Value::Object(out))
                }
                other => Err(type_error(path, "object", other)),
            },
            // Wrappers are unwrapped by `check`.
            Schema::Any | Schema::Optional(_) | Schema::Default(..) | Schema::Described(..) => self
                .check(Some(value), path)
                .map(|v| v.unwrap_or(Value::Null)),
        }
    }
}

fn type_error(path: &str, expected: &str, received: &Value) -> SchemaError {
    SchemaError::new(
        path,
        format!("Expected {expected}, received {}", type_name(received)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_input() -> Schema {
        Schema::object([
            ("location", Schema::String.describe("City name")),
            (
                "units",
                Schema::enumeration(["celsius", "fahrenheit"]).with_default(json!("celsius")),
            ),
            ("days", Schema::Integer.optional()),
        ])
    }

    #[test]
    fn test_example_walk() {
        let schema = Schema::object([
            ("name", Schema::String),
            ("count", Schema::Number),
            ("flag", Schema::Boolean),
            ("mode", Schema::enumeration(["fast", "slow"])),
            ("tags", Schema::array(Schema::String)),
            ("note", Schema::String.optional()),
            ("limit", Schema::Integer.with_default(json!(5))),
            ("extra", Schema::Any),
        ]);
        assert_eq!(
            schema.example(),
            json!({
                "name": "string",
                "count": 0,
                "flag": true,
                "mode": "fast",
                "tags": ["string"],
                "note": "string",
                "limit": 5,
                "extra": null
            })
        );
    }

    #[test]
    fn test_validate_applies_defaults_and_strips_unknown() {
        let out = weather_input()
            .validate(&json!({"location": "Paris", "extra": 1}))
            .unwrap();
        assert_eq!(out, json!({"location": "Paris", "units": "celsius"}));
    }

    #[test]
    fn test_validate_missing_required() {
        let err = weather_input().validate(&json!({})).unwrap_err();
        assert_eq!(err.path, "location");
        assert_eq!(err.to_string(), "location: Required");
    }

    #[test]
    fn test_validate_wrong_type() {
        let err = weather_input()
            .validate(&json!({"location": 42}))
            .unwrap_err();
        assert_eq!(err.to_string(), "location: Expected string, received number");
    }

    #[test]
    fn test_validate_enum() {
        let err = weather_input()
            .validate(&json!({"location": "Paris", "units": "kelvin"}))
            .unwrap_err();
        assert!(err.message.contains("Invalid enum value"));
        assert!(err.message.contains("'kelvin'"));
    }

    #[test]
    fn test_validate_top_level_type() {
        let err = weather_input().validate(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Expected object, received null");
    }

    #[test]
    fn test_validate_integer() {
        assert!(Schema::Integer.validate(&json!(3)).is_ok());
        assert!(Schema::Integer.validate(&json!(3.0)).is_ok());
        assert!(Schema::Integer.validate(&json!(3.5)).is_err());
    }

    #[test]
    fn test_validate_nested_array_path() {
        let schema = Schema::object([("items", Schema::array(Schema::Number))]);
        let err = schema
            .validate(&json!({"items": [1, "two"]}))
            .unwrap_err();
        assert_eq!(err.path, "items[1]");
    }

    #[test]
    fn test_any_accepts_everything() {
        assert_eq!(Schema::Any.validate(&json!([1, 2])).unwrap(), json!([1, 2]));
        assert_eq!(Schema::Any.validate(&Value::Null).unwrap(), Value::Null);
    }
}
