//! String-keyed configuration records.
//!
//! A [`ConfigRecord`] is the generic description a deserializer hands to
//! [`new_node_from_config`](crate::factory::new_node_from_config): at least a
//! `precision` and an `operation`, plus whatever parameters the operation's
//! constructor reads. Keys use the legacy camelCase spelling (`kernelWidth`,
//! `timeStep`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigRecord {
    fields: Map<String, Value>,
}

impl ConfigRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object. Any other JSON value is rejected.
    pub fn from_value(value: Value) -> Result<Self, GraphError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(wrong_type("<record>", "an object", &other)),
        }
    }

    /// Builder-style insert, handy when assembling records in code.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get_str(&self, field: &str) -> Result<&str, GraphError> {
        let value = self.require(field)?;
        value
            .as_str()
            .ok_or_else(|| wrong_type(field, "a string", value))
    }

    pub fn get_usize(&self, field: &str) -> Result<usize, GraphError> {
        let value = self.require(field)?;
        value
            .as_u64()
            .and_then(|raw| usize::try_from(raw).ok())
            .ok_or_else(|| wrong_type(field, "a non-negative integer", value))
    }

    pub fn usize_or(&self, field: &str, default: usize) -> Result<usize, GraphError> {
        if self.contains(field) {
            self.get_usize(field)
        } else {
            Ok(default)
        }
    }

    pub fn i64_or(&self, field: &str, default: i64) -> Result<i64, GraphError> {
        let Some(value) = self.get(field) else {
            return Ok(default);
        };
        value
            .as_i64()
            .ok_or_else(|| wrong_type(field, "an integer", value))
    }

    pub fn f64_or(&self, field: &str, default: f64) -> Result<f64, GraphError> {
        let Some(value) = self.get(field) else {
            return Ok(default);
        };
        value
            .as_f64()
            .ok_or_else(|| wrong_type(field, "a number", value))
    }

    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool, GraphError> {
        let Some(value) = self.get(field) else {
            return Ok(default);
        };
        value
            .as_bool()
            .ok_or_else(|| wrong_type(field, "a boolean", value))
    }

    pub fn str_or<'a>(&'a self, field: &str, default: &'a str) -> Result<&'a str, GraphError> {
        if self.contains(field) {
            self.get_str(field)
        } else {
            Ok(default)
        }
    }

    fn require(&self, field: &str) -> Result<&Value, GraphError> {
        self.fields.get(field).ok_or_else(|| missing(field))
    }
}

fn missing(field: &str) -> GraphError {
    GraphError::MissingConfigField {
        field: field.to_string(),
    }
}

fn wrong_type(field: &str, expected: &str, value: &Value) -> GraphError {
    GraphError::invalid_field(field, format!("expected {expected}, got {value}"))
}

impl TryFrom<Value> for ConfigRecord {
    type Error = GraphError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        ConfigRecord::from_value(value)
    }
}
