//! FILENAME: pipeline-engine/src/sorting.rs
//! Sorting Engine - Stable multi-key ordering over records.
//!
//! A sort request is an ordered expression list: the first expression is the
//! primary key, later ones break ties. The pass is stable, so records equal
//! under every expression keep their relative input order, which grouping
//! relies on when it prepends its own keys.
//!
//! Two seams: `SortingStrategy` supplies the value comparator for one key
//! (per-expression override or pass-wide default), `GridSortingStrategy`
//! owns the whole pass.

use std::cmp::Ordering;
use std::fmt;

use grid_data::{Record, Value};

use crate::definition::{SortingDirection, SortingExpression};

/// Value comparator for one sort key.
pub trait SortingStrategy: fmt::Debug + Send + Sync {
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering;
}

/// The stock comparator: null first, deterministic rank across variants,
/// natural order within a variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSortingStrategy;

impl SortingStrategy for DefaultSortingStrategy {
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        a.compare(b)
    }
}

/// Owns a whole sorting pass. The default implementation is the stable
/// multi-key sort; a custom one can reorder however it wants (or not at
/// all) without touching the engine.
pub trait GridSortingStrategy {
    fn sort(&self, records: &[Record], expressions: &[SortingExpression]) -> Vec<Record> {
        if expressions.is_empty() {
            return records.to_vec();
        }
        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| compare_records(a, b, expressions));
        sorted
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGridSortingStrategy;

impl GridSortingStrategy for DefaultGridSortingStrategy {}

/// Reads the sort key value for one expression, folding case when asked.
fn sort_value(record: &Record, expression: &SortingExpression) -> Value {
    let value = record.get(&expression.field_name);
    if expression.ignore_case {
        if let Value::Text(text) = value {
            return Value::Text(text.to_lowercase());
        }
    }
    value.clone()
}

/// Compares two records under one expression, honoring its direction and
/// per-expression strategy override.
pub fn compare_fields(a: &Record, b: &Record, expression: &SortingExpression) -> Ordering {
    let left = sort_value(a, expression);
    let right = sort_value(b, expression);
    let ordering = match &expression.strategy {
        Some(strategy) => strategy.compare_values(&left, &right),
        None => DefaultSortingStrategy.compare_values(&left, &right),
    };
    match expression.dir {
        SortingDirection::Asc => ordering,
        SortingDirection::Desc => ordering.reverse(),
    }
}

/// Compares two records under the full expression list (tie-breaking).
pub fn compare_records(a: &Record, b: &Record, expressions: &[SortingExpression]) -> Ordering {
    for expression in expressions {
        let ordering = compare_fields(a, b, expression);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Entry point used by the orchestrator and by callers sorting manually.
/// Always returns a new vector; the input is never mutated.
pub fn sort(
    records: &[Record],
    expressions: &[SortingExpression],
    strategy: Option<&dyn GridSortingStrategy>,
) -> Vec<Record> {
    match strategy {
        Some(strategy) => strategy.sort(records, expressions),
        None => DefaultGridSortingStrategy.sort(records, expressions),
    }
}
