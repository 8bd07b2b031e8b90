//! FILENAME: pipeline-engine/src/conditions.rs
//! Condition Catalogs - The named predicates filtering trees refer to.
//!
//! Every column data type has a fixed operand catalog (string, number,
//! boolean, date, time, dateTime) sharing the base null checks. Condition
//! names are the serialized contract: a tree leaf stores `conditionName`
//! and is resolved against a catalog before evaluation.
//!
//! Catalogs are not extensible in place, but callers can build a custom
//! operand from any catalog and `append` their own named conditions.
//!
//! Calendar-relative conditions (today, lastMonth, ...) compare against the
//! clock carried in the evaluation context, never a hidden global, so they
//! stay deterministic under test.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use grid_data::{DataType, Value};

// ============================================================================
// OPERATION & OPERAND
// ============================================================================

/// Per-evaluation inputs a condition may need besides its operands.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext {
    /// Lower-case both operands of string conditions.
    pub ignore_case: bool,

    /// The clock for calendar-relative conditions.
    pub now: NaiveDateTime,
}

impl ConditionContext {
    pub fn new(ignore_case: bool, now: NaiveDateTime) -> Self {
        ConditionContext { ignore_case, now }
    }
}

/// The predicate of a condition: target value, optional search value,
/// evaluation context.
pub type ConditionLogic = fn(&Value, Option<&Value>, &ConditionContext) -> bool;

/// A named, executable filtering condition.
#[derive(Debug, Clone)]
pub struct FilteringOperation {
    /// Serialized identity of the condition within its catalog.
    pub name: String,

    /// Unary conditions ignore the search value entirely.
    pub is_unary: bool,

    pub logic: ConditionLogic,
}

impl FilteringOperation {
    pub fn unary(name: &str, logic: ConditionLogic) -> Self {
        FilteringOperation {
            name: name.to_string(),
            is_unary: true,
            logic,
        }
    }

    pub fn binary(name: &str, logic: ConditionLogic) -> Self {
        FilteringOperation {
            name: name.to_string(),
            is_unary: false,
            logic,
        }
    }
}

/// A catalog of named conditions for one column data type.
#[derive(Debug, Clone, Default)]
pub struct FilteringOperand {
    operations: Vec<FilteringOperation>,
}

impl FilteringOperand {
    /// The base catalog every data type shares.
    pub fn base() -> Self {
        FilteringOperand {
            operations: vec![
                FilteringOperation::unary("null", |target, _, _| target.is_null()),
                FilteringOperation::unary("notNull", |target, _, _| !target.is_null()),
            ],
        }
    }

    pub fn from_operations(operations: Vec<FilteringOperation>) -> Self {
        let mut operand = FilteringOperand::base();
        for op in operations {
            operand.append(op);
        }
        operand
    }

    /// Looks a condition up by name.
    pub fn condition(&self, name: &str) -> Option<&FilteringOperation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// The names of every registered condition, in registration order.
    pub fn condition_list(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }

    /// Registers a condition. A condition with the same name is replaced,
    /// so custom operands can shadow catalog entries.
    pub fn append(&mut self, operation: FilteringOperation) {
        match self.operations.iter().position(|op| op.name == operation.name) {
            Some(index) => self.operations[index] = operation,
            None => self.operations.push(operation),
        }
    }
}

/// The stock catalog for a column data type.
pub fn operand_for(data_type: DataType) -> FilteringOperand {
    match data_type {
        DataType::String => string_operand(),
        DataType::Number => number_operand(),
        DataType::Boolean => boolean_operand(),
        DataType::Date => date_operand(),
        DataType::Time => time_operand(),
        DataType::DateTime => date_time_operand(),
    }
}

// ============================================================================
// STRING CONDITIONS
// ============================================================================

/// Text coercion for string conditions: null reads as the empty string,
/// anything else as its display text.
fn fold_text(value: &Value, ignore_case: bool) -> String {
    let text = value.display_value();
    if ignore_case {
        text.to_lowercase()
    } else {
        text
    }
}

fn search_text(search: Option<&Value>, ignore_case: bool) -> String {
    search.map(|v| fold_text(v, ignore_case)).unwrap_or_default()
}

pub fn string_operand() -> FilteringOperand {
    FilteringOperand::from_operations(vec![
        FilteringOperation::binary("contains", |target, search, ctx| {
            fold_text(target, ctx.ignore_case).contains(&search_text(search, ctx.ignore_case))
        }),
        FilteringOperation::binary("doesNotContain", |target, search, ctx| {
            !fold_text(target, ctx.ignore_case).contains(&search_text(search, ctx.ignore_case))
        }),
        FilteringOperation::binary("startsWith", |target, search, ctx| {
            fold_text(target, ctx.ignore_case).starts_with(&search_text(search, ctx.ignore_case))
        }),
        FilteringOperation::binary("endsWith", |target, search, ctx| {
            fold_text(target, ctx.ignore_case).ends_with(&search_text(search, ctx.ignore_case))
        }),
        FilteringOperation::binary("equals", |target, search, ctx| {
            fold_text(target, ctx.ignore_case) == search_text(search, ctx.ignore_case)
        }),
        FilteringOperation::binary("doesNotEqual", |target, search, ctx| {
            fold_text(target, ctx.ignore_case) != search_text(search, ctx.ignore_case)
        }),
        FilteringOperation::unary("empty", |target, _, _| {
            target.display_value().is_empty()
        }),
        FilteringOperation::unary("notEmpty", |target, _, _| {
            !target.display_value().is_empty()
        }),
    ])
}

// ============================================================================
// NUMBER CONDITIONS
// ============================================================================

fn search_number(search: Option<&Value>) -> Option<f64> {
    search.and_then(|v| v.as_number())
}

pub fn number_operand() -> FilteringOperand {
    FilteringOperand::from_operations(vec![
        FilteringOperation::binary("equals", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t == s,
                _ => false,
            }
        }),
        FilteringOperation::binary("doesNotEqual", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t != s,
                _ => true,
            }
        }),
        FilteringOperation::binary("greaterThan", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t > s,
                _ => false,
            }
        }),
        FilteringOperation::binary("lessThan", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t < s,
                _ => false,
            }
        }),
        FilteringOperation::binary("greaterThanOrEqualTo", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t >= s,
                _ => false,
            }
        }),
        FilteringOperation::binary("lessThanOrEqualTo", |target, search, _| {
            match (target.as_number(), search_number(search)) {
                (Some(t), Some(s)) => t <= s,
                _ => false,
            }
        }),
        FilteringOperation::unary("empty", |target, _, _| match target {
            Value::Null => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }),
        FilteringOperation::unary("notEmpty", |target, _, _| match target {
            Value::Null => false,
            Value::Number(n) => !n.is_nan(),
            _ => true,
        }),
    ])
}

// ============================================================================
// BOOLEAN CONDITIONS
// ============================================================================

pub fn boolean_operand() -> FilteringOperand {
    FilteringOperand::from_operations(vec![
        FilteringOperation::unary("all", |_, _, _| true),
        FilteringOperation::unary("true", |target, _, _| {
            matches!(target, Value::Bool(true))
        }),
        FilteringOperation::unary("false", |target, _, _| {
            matches!(target, Value::Bool(false))
        }),
        FilteringOperation::unary("empty", |target, _, _| target.is_null()),
        FilteringOperation::unary("notEmpty", |target, _, _| !target.is_null()),
    ])
}

// ============================================================================
// DATE & DATETIME CONDITIONS
// ============================================================================

/// Date-bearing values promoted to a timestamp: a plain date reads as
/// midnight. Used by before/after so mixed Date/DateTime columns compare
/// chronologically.
fn as_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

fn search_timestamp(search: Option<&Value>) -> Option<NaiveDateTime> {
    search.and_then(as_timestamp)
}

fn same_second(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
        && a.hour() == b.hour()
        && a.minute() == b.minute()
        && a.second() == b.second()
}

fn month_of(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + offset;
    (zero_based.div_euclid(12), (zero_based.rem_euclid(12) + 1) as u32)
}

fn date_bucket_conditions() -> Vec<FilteringOperation> {
    vec![
        FilteringOperation::unary("today", |target, _, ctx| {
            target.as_date() == Some(ctx.now.date())
        }),
        FilteringOperation::unary("yesterday", |target, _, ctx| {
            match (target.as_date(), ctx.now.date().pred_opt()) {
                (Some(t), Some(y)) => t == y,
                _ => false,
            }
        }),
        FilteringOperation::unary("thisMonth", |target, _, ctx| {
            target.as_date().map_or(false, |t| {
                (t.year(), t.month()) == (ctx.now.year(), ctx.now.month())
            })
        }),
        FilteringOperation::unary("lastMonth", |target, _, ctx| {
            target.as_date().map_or(false, |t| {
                (t.year(), t.month()) == month_of(ctx.now.year(), ctx.now.month(), -1)
            })
        }),
        FilteringOperation::unary("nextMonth", |target, _, ctx| {
            target.as_date().map_or(false, |t| {
                (t.year(), t.month()) == month_of(ctx.now.year(), ctx.now.month(), 1)
            })
        }),
        FilteringOperation::unary("thisYear", |target, _, ctx| {
            target.as_date().map_or(false, |t| t.year() == ctx.now.year())
        }),
        FilteringOperation::unary("lastYear", |target, _, ctx| {
            target.as_date().map_or(false, |t| t.year() == ctx.now.year() - 1)
        }),
        FilteringOperation::unary("nextYear", |target, _, ctx| {
            target.as_date().map_or(false, |t| t.year() == ctx.now.year() + 1)
        }),
        FilteringOperation::unary("empty", |target, _, _| target.is_null()),
        FilteringOperation::unary("notEmpty", |target, _, _| !target.is_null()),
    ]
}

pub fn date_operand() -> FilteringOperand {
    let mut operations = vec![
        // Calendar-day comparison: the time component never participates.
        FilteringOperation::binary("equals", |target, search, _| {
            match (target.as_date(), search.and_then(|s| s.as_date())) {
                (Some(t), Some(s)) => t == s,
                _ => false,
            }
        }),
        FilteringOperation::binary("doesNotEqual", |target, search, _| {
            match (target.as_date(), search.and_then(|s| s.as_date())) {
                (Some(t), Some(s)) => t != s,
                _ => true,
            }
        }),
        FilteringOperation::binary("before", |target, search, _| {
            match (as_timestamp(target), search_timestamp(search)) {
                (Some(t), Some(s)) => t < s,
                _ => false,
            }
        }),
        FilteringOperation::binary("after", |target, search, _| {
            match (as_timestamp(target), search_timestamp(search)) {
                (Some(t), Some(s)) => t > s,
                _ => false,
            }
        }),
    ];
    operations.extend(date_bucket_conditions());
    FilteringOperand::from_operations(operations)
}

pub fn date_time_operand() -> FilteringOperand {
    let mut operand = date_operand();
    // Second precision replaces the calendar-day equality.
    operand.append(FilteringOperation::binary("equals", |target, search, _| {
        match (as_timestamp(target), search_timestamp(search)) {
            (Some(t), Some(s)) => same_second(t, s),
            _ => false,
        }
    }));
    operand.append(FilteringOperation::binary(
        "doesNotEqual",
        |target, search, _| match (as_timestamp(target), search_timestamp(search)) {
            (Some(t), Some(s)) => !same_second(t, s),
            _ => true,
        },
    ));
    operand
}

// ============================================================================
// TIME CONDITIONS
// ============================================================================

fn time_parts(value: &Value) -> Option<(u32, u32, u32)> {
    value.as_time().map(|t| (t.hour(), t.minute(), t.second()))
}

fn search_time_parts(search: Option<&Value>) -> Option<(u32, u32, u32)> {
    search.and_then(time_parts)
}

pub fn time_operand() -> FilteringOperand {
    FilteringOperand::from_operations(vec![
        FilteringOperation::binary("at", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t == s,
                _ => false,
            }
        }),
        FilteringOperation::binary("not_at", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t != s,
                _ => true,
            }
        }),
        FilteringOperation::binary("before", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t < s,
                _ => false,
            }
        }),
        FilteringOperation::binary("after", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t > s,
                _ => false,
            }
        }),
        FilteringOperation::binary("at_before", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t <= s,
                _ => false,
            }
        }),
        FilteringOperation::binary("at_after", |target, search, _| {
            match (time_parts(target), search_time_parts(search)) {
                (Some(t), Some(s)) => t >= s,
                _ => false,
            }
        }),
        FilteringOperation::unary("empty", |target, _, _| target.is_null()),
        FilteringOperation::unary("notEmpty", |target, _, _| !target.is_null()),
    ])
}

// ============================================================================
// FIELD DESCRIPTORS
// ============================================================================

/// A column's identity for tree rehydration: which field, which catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub field: String,
    pub data_type: DataType,
}

impl FieldDescriptor {
    pub fn new(field: impl Into<String>, data_type: DataType) -> Self {
        FieldDescriptor {
            field: field.into(),
            data_type,
        }
    }
}
