//! Typed contracts for tool and prompt payloads.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s. It is checked once at
//! registration ([`Schema::check_well_formed`]) and then used at every call
//! boundary ([`Schema::validate`]) so that handlers only ever see
//! [`ValidatedArgs`], never a raw JSON bag.
//!
//! ```text
//!  raw JSON ──▶ Schema::validate ──▶ ValidatedArgs ──▶ handler
//!                    │
//!                    └─▶ Vec<FieldViolation>  (one entry per offending path)
//! ```
//!
//! Violations carry JSON-ish field paths (`prNumber`, `filesChanged[1]`) so
//! the caller can see every problem in a single round trip.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Value type of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Homogeneous array of the inner type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Shorthand for `Array(String)`, the most common list shape.
    pub fn string_array() -> Self {
        FieldType::Array(Box::new(FieldType::String))
    }

    /// JSON Schema `type` keyword for this field type.
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Array(inner) => serde_json::json!({
                "type": "array",
                "items": inner.to_json_schema(),
            }),
            other => serde_json::json!({ "type": other.json_type() }),
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<FieldViolation>) -> bool {
        let ok = match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array(inner) => match value.as_array() {
                Some(items) => {
                    let mut all_ok = true;
                    for (i, item) in items.iter().enumerate() {
                        let item_path = format!("{}[{}]", path, i);
                        all_ok &= inner.check(item, &item_path, out);
                    }
                    return all_ok;
                }
                None => false,
            },
        };

        if !ok {
            out.push(FieldViolation::new(
                path,
                format!("expected {}, got {}", self.json_type(), json_kind(value)),
            ));
        }
        ok
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Array(inner) => write!(f, "array<{}>", inner),
            other => write!(f, "{}", other.json_type()),
        }
    }
}

/// Extra validation rule on top of the field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Strings and arrays must not be empty
    NonEmpty,
    /// Integers must be `>= n`
    Min(i64),
    /// Strings must be at most `n` characters
    MaxLength(usize),
}

impl Constraint {
    fn applies_to(&self, field_type: &FieldType) -> bool {
        match self {
            Constraint::NonEmpty => {
                matches!(field_type, FieldType::String | FieldType::Array(_))
            }
            Constraint::Min(_) => matches!(field_type, FieldType::Integer),
            Constraint::MaxLength(_) => matches!(field_type, FieldType::String),
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<FieldViolation>) {
        match self {
            Constraint::NonEmpty => {
                let empty = match value {
                    Value::String(s) => s.trim().is_empty(),
                    Value::Array(items) => items.is_empty(),
                    _ => false,
                };
                if empty {
                    out.push(FieldViolation::new(path, "must not be empty"));
                }
            }
            Constraint::Min(min) => {
                // u64 values above i64::MAX are trivially >= any i64 minimum
                if let Some(n) = value.as_i64()
                    && n < *min
                {
                    out.push(FieldViolation::new(path, format!("must be >= {}", min)));
                }
            }
            Constraint::MaxLength(max) => {
                if let Some(s) = value.as_str()
                    && s.chars().count() > *max
                {
                    out.push(FieldViolation::new(
                        path,
                        format!("must be at most {} characters", max),
                    ));
                }
            }
        }
    }

    fn annotate(&self, schema: &mut Map<String, Value>, field_type: &FieldType) {
        match (self, field_type) {
            (Constraint::NonEmpty, FieldType::Array(_)) => {
                schema.insert("minItems".into(), Value::from(1));
            }
            (Constraint::NonEmpty, _) => {
                schema.insert("minLength".into(), Value::from(1));
            }
            (Constraint::Min(n), _) => {
                schema.insert("minimum".into(), Value::from(*n));
            }
            (Constraint::MaxLength(n), _) => {
                schema.insert("maxLength".into(), Value::from(*n));
            }
        }
    }
}

/// Specification of one named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub field_type: FieldType,
    pub required: bool,
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    /// New string field. Use [`with_type`](Self::with_type) for other types.
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            field_type: FieldType::String,
            required,
            constraints: Vec::new(),
        }
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// A single validation failure, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Render a violation list as `a: msg; b: msg`.
pub fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Object schema: an ordered set of named fields.
///
/// Unknown fields are rejected; `null` for an optional field counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Reject schemas that could never validate consistently.
    pub fn check_well_formed(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err("field name must not be empty".to_string());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate field '{}'", field.name));
            }
            if let Some(c) = field
                .constraints
                .iter()
                .find(|c| !c.applies_to(&field.field_type))
            {
                return Err(format!(
                    "constraint {:?} does not apply to {} field '{}'",
                    c, field.field_type, field.name
                ));
            }
        }
        Ok(())
    }

    /// Validate a raw payload.
    ///
    /// `null` is accepted as an empty object so that calls with omitted
    /// arguments still get per-field "missing" reports.
    pub fn validate(&self, value: &Value) -> Result<ValidatedArgs, Vec<FieldViolation>> {
        let empty = Map::new();
        let object = match value {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldViolation::new(
                    "$",
                    format!("expected object, got {}", json_kind(other)),
                )]);
            }
        };

        let mut violations = Vec::new();
        let mut accepted = Map::new();

        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        violations.push(FieldViolation::new(&field.name, "missing required field"));
                    }
                }
                Some(v) => {
                    if field.field_type.check(v, &field.name, &mut violations) {
                        for constraint in &field.constraints {
                            constraint.check(v, &field.name, &mut violations);
                        }
                    }
                    accepted.insert(field.name.clone(), v.clone());
                }
            }
        }

        for key in object.keys() {
            if self.field(key).is_none() {
                violations.push(FieldViolation::new(key, "unknown field"));
            }
        }

        if violations.is_empty() {
            Ok(ValidatedArgs { values: accepted })
        } else {
            Err(violations)
        }
    }

    /// JSON Schema rendering used when listing declarations.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut prop = match field.field_type.to_json_schema() {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            prop.insert("description".into(), Value::from(field.description.clone()));
            for constraint in &field.constraints {
                constraint.annotate(&mut prop, &field.field_type);
            }
            properties.insert(field.name.clone(), Value::Object(prop));

            if field.required {
                required.push(Value::from(field.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Payload that has passed [`Schema::validate`].
///
/// Only constructible through validation, so holding one is proof that every
/// declared field has the right type and every constraint holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Get a string the schema marked as required.
    pub fn require_str(&self, key: &str) -> Result<&str, String> {
        self.get_str(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|v| v.as_bool())
    }

    /// Collect a string array; missing field yields an empty list.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decode into a strongly typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.values.clone()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
