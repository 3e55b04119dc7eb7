//! Schema types
//!
//! A [`RecordSchema`] is the declared shape of one raw record type. Records
//! are validated against it when they are parsed, so a bad line becomes a
//! [`RejectReason`] instead of a half-typed value deep inside a transform.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key in the raw JSON object
    pub name: &'static str,
    /// Declared type
    pub field_type: FieldType,
    /// Whether absence or `null` rejects the record
    pub required: bool,
}

impl FieldSpec {
    /// Required field
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
        }
    }

    /// Optional field
    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }
}

/// A typed field value that passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    /// A string with no visible characters
    fn is_blank(&self) -> bool {
        matches!(self, FieldValue::String(s) if s.trim().is_empty())
    }
}

/// Why a raw record was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The line is not valid JSON
    MalformedJson { message: String },
    /// The line is JSON but not an object
    NotAnObject,
    /// A required field is absent or null
    MissingField { field: String },
    /// A field's value cannot be read as its declared type
    InvalidValue {
        field: String,
        expected: FieldType,
        found: String,
    },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MalformedJson { message } => write!(f, "malformed JSON: {message}"),
            RejectReason::NotAnObject => write!(f, "record is not a JSON object"),
            RejectReason::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            RejectReason::InvalidValue {
                field,
                expected,
                found,
            } => write!(f, "field '{field}' expected {expected}, found {found}"),
        }
    }
}

/// Declared schema of one raw record type
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Schema name (used in logs)
    pub name: &'static str,
    /// Declared fields
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema from its fields
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Validate a raw JSON value against this schema
    ///
    /// Fields not declared in the schema are ignored. A blank string in a
    /// required field counts as missing.
    pub fn validate(&self, value: &Value) -> Result<ValidatedRecord, RejectReason> {
        let Value::Object(obj) = value else {
            return Err(RejectReason::NotAnObject);
        };

        let mut values = HashMap::with_capacity(self.fields.len());

        for spec in &self.fields {
            let raw = obj.get(spec.name).filter(|v| !v.is_null());
            let typed = raw.map(|v| coerce(spec, v)).transpose()?.flatten();
            let typed = typed.filter(|t| !(spec.required && t.is_blank()));
            match typed {
                Some(typed) => {
                    values.insert(spec.name, typed);
                }
                None if spec.required => {
                    return Err(RejectReason::MissingField {
                        field: spec.name.to_string(),
                    });
                }
                None => {}
            }
        }

        Ok(ValidatedRecord { values })
    }
}

/// Read one raw value as the declared type
///
/// `Ok(None)` means the value is present but carries nothing (an empty string
/// in a numeric column).
fn coerce(spec: &FieldSpec, value: &Value) -> Result<Option<FieldValue>, RejectReason> {
    let invalid = || RejectReason::InvalidValue {
        field: spec.name.to_string(),
        expected: spec.field_type,
        found: describe(value),
    };

    match spec.field_type {
        FieldType::String => match value {
            Value::String(s) => Ok(Some(FieldValue::String(s.clone()))),
            Value::Number(n) => Ok(Some(FieldValue::String(n.to_string()))),
            Value::Bool(b) => Ok(Some(FieldValue::String(b.to_string()))),
            _ => Err(invalid()),
        },
        FieldType::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(FieldValue::Integer(i)))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(Some(FieldValue::Integer(f as i64)))
                        }
                        _ => Err(invalid()),
                    }
                }
            }
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Some(FieldValue::Integer(i)))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        FieldType::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .map(|f| Some(FieldValue::Float(f)))
                .ok_or_else(invalid),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(FieldValue::Float(f))),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
    }
}

/// Short description of a JSON value for rejection messages
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => {
            let shown: String = s.chars().take(40).collect();
            format!("string {shown:?}")
        }
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

/// A record that passed validation, with typed access by field name
#[derive(Debug, Clone, Default)]
pub struct ValidatedRecord {
    values: HashMap<&'static str, FieldValue>,
}

impl ValidatedRecord {
    /// Raw typed value
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// String value
    pub fn string(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            FieldValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Integer value
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            FieldValue::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::String(_) => None,
        }
    }

    /// Required string value
    ///
    /// Only call for fields the schema declares required.
    pub fn required_string(&self, name: &str) -> String {
        self.string(name).unwrap_or_default()
    }
}
