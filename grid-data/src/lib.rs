//! FILENAME: grid-data/src/lib.rs
//! PURPOSE: Main library entry point for the shared grid data model.
//! CONTEXT: Re-exports the value and record types used by every pipeline
//! stage. Kept free of any transformation logic on purpose.

pub mod record;
pub mod value;

// Re-export commonly used types at the crate root
pub use record::Record;
pub use value::{DataType, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_records() {
        let record = Record::from_pairs([
            ("name", Value::from("Alice")),
            ("age", Value::from(30)),
            ("active", Value::from(true)),
        ]);
        assert_eq!(record.get("age"), &Value::Number(30.0));
        assert_eq!(record.get("active"), &Value::Bool(true));
    }

    #[test]
    fn it_compares_values() {
        let a = Value::from("apple");
        let b = Value::from("banana");
        assert_eq!(a.compare(&b), std::cmp::Ordering::Less);
    }
}
