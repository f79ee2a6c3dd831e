use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("missing required argument: {0}")]
    MissingRequired(String),
    #[error("argument `{name}` must be of type {expected}")]
    WrongType { name: String, expected: String },
}

/// Builder for the `{"type": "object", ...}` parameter block of a function spec.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "string", description, required)
    }

    pub fn property(mut self, name: &str, kind: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties),
            "required": self.required,
        })
    }
}

/// Checks `arguments` against an object schema: every required key must be
/// present and every declared property must match its primitive type.
/// Keys the schema does not mention are passed through.
pub fn validate_arguments(
    schema: &Value,
    arguments: &Map<String, Value>,
) -> Result<(), SchemaViolation> {
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    for name in required {
        if !arguments.contains_key(name) {
            return Err(SchemaViolation::MissingRequired(name.to_string()));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, value) in arguments {
        let expected = properties
            .get(name)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str);
        if let Some(expected) = expected {
            if !matches_type(expected, value) {
                return Err(SchemaViolation::WrongType {
                    name: name.clone(),
                    expected: expected.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}
