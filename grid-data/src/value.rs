//! FILENAME: grid-data/src/value.rs
//! PURPOSE: Defines the dynamic scalar type a grid cell can hold.
//! CONTEXT: The pipeline is schema-agnostic; every field of every record is
//! one of these variants. Comparison and display rules live here so the
//! sorting, merging and filtering engines all agree on them.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// The declared type of a column, used to pick a condition catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Time,
    DateTime,
}

/// A single cell value.
///
/// Serializes untagged so search values round-trip as plain JSON scalars
/// (`"Alice"`, `30`, `true`). Date/time variants serialize as ISO strings;
/// on deserialization such strings land in `Text` and are promoted to the
/// proper variant when a tree is rehydrated against column types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Rank used to order values of different variants deterministically.
    /// Null sorts ahead of everything regardless of direction.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
            Value::Date(_) => 4,
            Value::Time(_) => 5,
            Value::DateTime(_) => 6,
        }
    }

    /// Total order over values: null first, then by variant rank, then
    /// within-variant order. NaN sorts after every other number so the
    /// order stays total.
    pub fn compare(&self, other: &Value) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
                Some(ord) => ord,
                None => match (a.is_nan(), b.is_nan()) {
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    _ => Ordering::Equal,
                },
            },
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            // Unreachable: equal ranks imply equal variants.
            _ => Ordering::Equal,
        }
    }

    /// Returns the display text for the value.
    /// String conditions also use this to coerce non-string targets.
    pub fn display_value(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            Value::Bool(b) => {
                if *b { "true" } else { "false" }.to_string()
            }
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// The calendar day of a date-bearing value, if it has one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// The time-of-day component of a time-bearing value, if it has one.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::DateTime(dt) => Some(dt.time()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Promotes a deserialized value to the variant a column of `data_type`
    /// holds. JSON carries dates and times as text, so tree rehydration
    /// calls this to turn ISO strings back into scalars. Returns `None`
    /// when the text does not parse as the column's type; values already of
    /// the right shape pass through, and non-temporal columns never
    /// transform.
    pub fn promote(&self, data_type: DataType) -> Option<Value> {
        match (data_type, self) {
            (DataType::Date, Value::Text(s)) => parse_date_text(s).map(Value::Date),
            (DataType::Time, Value::Text(s)) => {
                NaiveTime::parse_from_str(s, "%H:%M:%S").ok().map(Value::Time)
            }
            (DataType::DateTime, Value::Text(s)) => {
                parse_date_time_text(s).map(Value::DateTime)
            }
            _ => Some(self.clone()),
        }
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|dt| dt.date())
    })
}

fn parse_date_time_text(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            // A bare day on a dateTime column means its midnight.
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}
