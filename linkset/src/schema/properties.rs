//! Validation of edge properties against a field's `properties` schema
//!
//! The schema language is the JSON Schema subset relationship fields use to
//! describe `_refProperties`: `type`, `required`, `properties`,
//! `additionalProperties: false`, `items`, `enum`, `minimum`/`maximum` and
//! `minLength`/`maxLength`.

use serde_json::{Map, Value};

/// Error types for property validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertiesError {
    #[error("Invalid properties schema: {0}")]
    InvalidSchema(String),

    #[error("Missing required property '{0}'")]
    MissingRequired(String),

    #[error("Unexpected property '{0}'")]
    Unexpected(String),

    #[error("Type mismatch for '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid value for '{path}': {reason}")]
    Constraint { path: String, reason: String },
}

/// Properties that belong to the edge record itself, never to the schema
const RESERVED: [&str; 2] = ["_id", "_rev"];

/// Validator for `_refProperties` values
pub struct PropertiesValidator;

impl PropertiesValidator {
    /// Validate `properties` against `schema`. A null schema accepts anything.
    pub fn validate(schema: &Value, properties: &Map<String, Value>) -> Result<(), PropertiesError> {
        if schema.is_null() {
            return Ok(());
        }

        let mut document = properties.clone();
        for reserved in RESERVED {
            document.remove(reserved);
        }
        Self::validate_value(schema, &Value::Object(document), "")
    }

    /// Check that a schema only uses supported types
    pub fn parse_schema(schema: &Value) -> Result<(), PropertiesError> {
        match schema {
            Value::Null => Ok(()),
            Value::Object(map) => {
                if let Some(kind) = map.get("type") {
                    match kind.as_str() {
                        Some("null" | "boolean" | "object" | "array" | "number" | "string" | "integer") => {}
                        _ => {
                            return Err(PropertiesError::InvalidSchema(format!(
                                "Invalid type: {}",
                                kind
                            )));
                        }
                    }
                }
                if let Some(Value::Object(properties)) = map.get("properties") {
                    for nested in properties.values() {
                        Self::parse_schema(nested)?;
                    }
                }
                if let Some(items) = map.get("items") {
                    Self::parse_schema(items)?;
                }
                Ok(())
            }
            _ => Err(PropertiesError::InvalidSchema(
                "Schema must be an object or null".to_string(),
            )),
        }
    }

    fn validate_value(schema: &Value, data: &Value, path: &str) -> Result<(), PropertiesError> {
        let schema = schema.as_object().ok_or_else(|| {
            PropertiesError::InvalidSchema(format!("Schema for '{}' must be an object", path))
        })?;

        if let Some(expected) = schema.get("type") {
            Self::validate_type(expected, data, path)?;
        }

        if let Value::Object(object) = data {
            if let Some(Value::Array(required)) = schema.get("required") {
                for name in required.iter().filter_map(Value::as_str) {
                    if !object.contains_key(name) {
                        return Err(PropertiesError::MissingRequired(join(path, name)));
                    }
                }
            }

            let declared = schema.get("properties").and_then(Value::as_object);
            if let Some(declared) = declared {
                for (name, nested) in declared {
                    if let Some(value) = object.get(name) {
                        Self::validate_value(nested, value, &join(path, name))?;
                    }
                }
            }

            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                for name in object.keys() {
                    if !declared.is_some_and(|d| d.contains_key(name)) {
                        return Err(PropertiesError::Unexpected(join(path, name)));
                    }
                }
            }
        }

        if let (Some(items), Value::Array(values)) = (schema.get("items"), data) {
            for (index, value) in values.iter().enumerate() {
                Self::validate_value(items, value, &join(path, &index.to_string()))?;
            }
        }

        if let Some(Value::Array(allowed)) = schema.get("enum") {
            if !allowed.contains(data) {
                return Err(PropertiesError::Constraint {
                    path: display_path(path),
                    reason: format!("{} is not one of {}", data, Value::Array(allowed.clone())),
                });
            }
        }

        if let Some(number) = data.as_f64() {
            if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
                if number < minimum {
                    return Err(PropertiesError::Constraint {
                        path: display_path(path),
                        reason: format!("{} is less than minimum {}", number, minimum),
                    });
                }
            }
            if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
                if number > maximum {
                    return Err(PropertiesError::Constraint {
                        path: display_path(path),
                        reason: format!("{} is greater than maximum {}", number, maximum),
                    });
                }
            }
        }

        if let Some(text) = data.as_str() {
            let length = text.chars().count() as u64;
            if let Some(min_length) = schema.get("minLength").and_then(Value::as_u64) {
                if length < min_length {
                    return Err(PropertiesError::Constraint {
                        path: display_path(path),
                        reason: format!("length {} is less than minimum {}", length, min_length),
                    });
                }
            }
            if let Some(max_length) = schema.get("maxLength").and_then(Value::as_u64) {
                if length > max_length {
                    return Err(PropertiesError::Constraint {
                        path: display_path(path),
                        reason: format!("length {} exceeds maximum {}", length, max_length),
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_type(expected: &Value, data: &Value, path: &str) -> Result<(), PropertiesError> {
        let expected = expected
            .as_str()
            .ok_or_else(|| PropertiesError::InvalidSchema("Type must be a string".to_string()))?;

        let actual = match data {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };

        let matches = expected == actual
            || (expected == "integer" && data.as_f64().is_some_and(|n| n.fract() == 0.0));
        if matches {
            Ok(())
        } else {
            Err(PropertiesError::TypeMismatch {
                path: display_path(path),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

fn join(path: &str, name: &str) -> String {
    format!("{}/{}", path, name)
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
