//! # Raw Records
//!
//! Records are the flat key/value maps exchanged with a [`DataSource`](crate::DataSource).
//! At the orchestrator boundary the identity lives under [`ID_FIELD`]; each store is responsible
//! for translating it to its own native identity key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A raw record as stored and returned by a data source.
pub type Record = Map<String, Value>;

/// Name of the identity field in the public record representation.
pub const ID_FIELD: &str = "id";

/// Identity of a stored record.
///
/// Stores accept either textual or integer identities; other JSON values are rejected
/// when converting from a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Extracts the identity from a JSON value, if it has a usable shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }

    /// Reads the public identity field of a record.
    pub fn of(record: &Record) -> Option<Self> {
        record.get(ID_FIELD).and_then(Self::from_value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for RecordId {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        id.to_value()
    }
}
