//! FILENAME: grid-data/src/record.rs
//! PURPOSE: Defines the schema-agnostic record the pipeline transforms.
//! CONTEXT: A record is a bag of named values. The pipeline never relies on
//! a schema: a field absent from a record reads as null, matching how sparse
//! grid data behaves. Record identity is positional in whatever collection
//! the record travels in, never keyed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

const NULL_VALUE: Value = Value::Null;

/// A single data row: field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: FxHashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: FxHashMap::default(),
        }
    }

    /// Builds a record from (field, value) pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Record::new();
        for (field, value) in pairs {
            record.fields.insert(field.into(), value.into());
        }
        record
    }

    /// Reads a field searching by name. Absent fields read as null.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL_VALUE)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_field_reads_as_null() {
        let record = Record::from_pairs([("name", "Alice")]);
        assert_eq!(record.get("name"), &Value::Text("Alice".to_string()));
        assert_eq!(record.get("missing"), &Value::Null);
        assert!(!record.contains_field("missing"));
    }

    #[test]
    fn set_overwrites() {
        let mut record = Record::new();
        record.set("age", 30);
        record.set("age", 31);
        assert_eq!(record.get("age"), &Value::Number(31.0));
        assert_eq!(record.field_count(), 1);
    }

    #[test]
    fn serializes_as_plain_object() {
        let record = Record::from_pairs([("active", Value::Bool(true))]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"active":true}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
