//! Document types
//!
//! Callers hand the store a [`Document`]: an optional key plus a payload of
//! JSON fields. What lands on a node is a [`StoredDocument`], an envelope
//! that keeps routing metadata apart from the payload so caller fields can
//! never be overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload fields of a document
pub type Payload = Map<String, Value>;

/// A document as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Globally unique key; generated on insert when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub payload: Payload,
}

impl Document {
    /// Document without a key (one is generated on insert)
    pub fn new(payload: Payload) -> Self {
        Self { key: None, payload }
    }

    pub fn with_key(key: impl Into<String>, payload: Payload) -> Self {
        Self {
            key: Some(key.into()),
            payload,
        }
    }

    /// Add a payload field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Build a document from a JSON object.
    pub fn from_json(key: Option<String>, value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(payload) => Ok(Self { key, payload }),
            other => Err(crate::Error::InvalidConfig(format!(
                "document payload must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// The envelope written to a storage node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub key: String,
    /// Ordinal the document was routed to when it was inserted
    pub assigned_node: usize,
    pub inserted_at: DateTime<Utc>,
    pub payload: Payload,
}

impl StoredDocument {
    pub fn new(key: String, assigned_node: usize, payload: Payload) -> Self {
        Self {
            key,
            assigned_node,
            inserted_at: Utc::now(),
            payload,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }
}

/// Result of a single insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub key: String,
    pub node: usize,
    pub acknowledged: bool,
}
