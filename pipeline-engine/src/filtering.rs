//! FILENAME: pipeline-engine/src/filtering.rs
//! Filtering Engine - Evaluates condition trees against records.
//!
//! A record survives when both the primary and the advanced tree match it
//! (each empty or absent tree matches everything). AND/OR evaluation
//! short-circuits left to right, so children after the deciding one are
//! never evaluated.
//!
//! The strategy trait mirrors the seams a grid needs: a custom strategy can
//! replace the whole pass, the per-record match, or just how field values
//! are read (e.g. filtering on formatted display values).

use chrono::NaiveDateTime;

use grid_data::{Record, Value};

use crate::conditions::ConditionContext;
use crate::definition::{
    FilteringExpression, FilteringExpressionNode, FilteringExpressionsTree, FilteringLogic,
};
use crate::error::PipelineError;

/// Per-pass inputs shared by every condition evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FilteringContext {
    /// Clock for calendar-relative conditions.
    pub now: NaiveDateTime,
}

impl FilteringContext {
    pub fn new(now: NaiveDateTime) -> Self {
        FilteringContext { now }
    }
}

impl Default for FilteringContext {
    fn default() -> Self {
        FilteringContext {
            now: chrono::Local::now().naive_local(),
        }
    }
}

/// The filtering seam. Every method has a default implementation, so an
/// implementor overrides only the level it cares about.
pub trait FilteringStrategy {
    /// Runs the whole pass: keeps records matching both trees.
    fn filter(
        &self,
        records: &[Record],
        tree: Option<&FilteringExpressionsTree>,
        advanced_tree: Option<&FilteringExpressionsTree>,
        context: &FilteringContext,
    ) -> Result<Vec<Record>, PipelineError> {
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if self.matches_trees(record, tree, advanced_tree, context)? {
                kept.push(record.clone());
            }
        }
        Ok(kept)
    }

    /// One record against both trees.
    fn matches_trees(
        &self,
        record: &Record,
        tree: Option<&FilteringExpressionsTree>,
        advanced_tree: Option<&FilteringExpressionsTree>,
        context: &FilteringContext,
    ) -> Result<bool, PipelineError> {
        let primary = match tree {
            Some(tree) => self.match_record(record, tree, context)?,
            None => true,
        };
        if !primary {
            return Ok(false);
        }
        match advanced_tree {
            Some(tree) => self.match_record(record, tree, context),
            None => Ok(true),
        }
    }

    /// One record against one tree. An empty tree matches everything.
    fn match_record(
        &self,
        record: &Record,
        tree: &FilteringExpressionsTree,
        context: &FilteringContext,
    ) -> Result<bool, PipelineError> {
        if tree.filtering_operands.is_empty() {
            return Ok(true);
        }
        match tree.operator {
            FilteringLogic::And => {
                for node in &tree.filtering_operands {
                    if !self.match_node(record, node, context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilteringLogic::Or => {
                for node in &tree.filtering_operands {
                    if self.match_node(record, node, context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn match_node(
        &self,
        record: &Record,
        node: &FilteringExpressionNode,
        context: &FilteringContext,
    ) -> Result<bool, PipelineError> {
        match node {
            FilteringExpressionNode::Expression(expression) => {
                self.find_match_by_expression(record, expression, context)
            }
            FilteringExpressionNode::Tree(tree) => self.match_record(record, tree, context),
        }
    }

    /// One record against one leaf condition.
    fn find_match_by_expression(
        &self,
        record: &Record,
        expression: &FilteringExpression,
        context: &FilteringContext,
    ) -> Result<bool, PipelineError> {
        let condition = expression.condition.as_ref().ok_or_else(|| {
            PipelineError::UnresolvedCondition {
                field: expression.field_name.clone(),
                name: expression.condition_name.clone(),
            }
        })?;
        let value = self.get_field_value(record, &expression.field_name);
        let search = if condition.is_unary {
            None
        } else {
            expression.search_val.as_ref()
        };
        let condition_context = ConditionContext::new(expression.ignore_case, context.now);
        Ok((condition.logic)(&value, search, &condition_context))
    }

    /// How a field is read off a record. Overridable so strategies can
    /// filter on derived values (formatted text, computed fields).
    fn get_field_value(&self, record: &Record, field_name: &str) -> Value {
        record.get(field_name).clone()
    }
}

/// The stock strategy: plain field reads, full tree walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFilteringStrategy;

impl FilteringStrategy for DefaultFilteringStrategy {}

/// Entry point used by the orchestrator and by callers filtering manually.
pub fn filter(
    records: &[Record],
    tree: Option<&FilteringExpressionsTree>,
    advanced_tree: Option<&FilteringExpressionsTree>,
    strategy: Option<&dyn FilteringStrategy>,
    context: &FilteringContext,
) -> Result<Vec<Record>, PipelineError> {
    match strategy {
        Some(strategy) => strategy.filter(records, tree, advanced_tree, context),
        None => DefaultFilteringStrategy.filter(records, tree, advanced_tree, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{self, FilteringOperand};
    use crate::definition::FilteringLogic;

    fn employees() -> Vec<Record> {
        vec![
            Record::from_pairs([
                ("name", Value::from("Alice")),
                ("age", Value::from(30)),
                ("city", Value::from("New York")),
            ]),
            Record::from_pairs([
                ("name", Value::from("Bob")),
                ("age", Value::from(25)),
                ("city", Value::from("Los Angeles")),
            ]),
            Record::from_pairs([
                ("name", Value::from("Charlie")),
                ("age", Value::from(35)),
                ("city", Value::from("New York")),
            ]),
            Record::from_pairs([
                ("name", Value::from("Diana")),
                ("age", Value::from(28)),
                ("city", Value::from("Houston")),
            ]),
        ]
    }

    fn leaf(
        field: &str,
        operand: &FilteringOperand,
        name: &str,
        search: Option<Value>,
    ) -> FilteringExpression {
        FilteringExpression::new(field, operand, name, search).unwrap()
    }

    fn ctx() -> FilteringContext {
        FilteringContext::default()
    }

    #[test]
    fn test_empty_tree_is_identity() {
        let records = employees();
        let tree = FilteringExpressionsTree::new(FilteringLogic::And);
        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn test_absent_trees_are_identity() {
        let records = employees();
        let out = filter(&records, None, None, None, &ctx()).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn test_single_condition() {
        let records = employees();
        let numbers = conditions::number_operand();
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        tree.push_expression(leaf("age", &numbers, "greaterThan", Some(28.into())));

        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        let names: Vec<_> = out.iter().map(|r| r.get("name").display_value()).collect();
        assert_eq!(names, vec!["Alice", "Charlie"]);
    }

    #[test]
    fn test_and_combines_conditions() {
        let records = employees();
        let numbers = conditions::number_operand();
        let strings = conditions::string_operand();
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        tree.push_expression(leaf("age", &numbers, "greaterThan", Some(26.into())));
        tree.push_expression(leaf("city", &strings, "equals", Some("New York".into())));

        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_or_with_nested_tree() {
        let records = employees();
        let numbers = conditions::number_operand();
        let strings = conditions::string_operand();

        // age < 26 OR (city contains "New" AND age >= 35)
        let mut nested = FilteringExpressionsTree::new(FilteringLogic::And);
        nested.push_expression(leaf("city", &strings, "contains", Some("New".into())));
        nested.push_expression(leaf("age", &numbers, "greaterThanOrEqualTo", Some(35.into())));

        let mut tree = FilteringExpressionsTree::new(FilteringLogic::Or);
        tree.push_expression(leaf("age", &numbers, "lessThan", Some(26.into())));
        tree.push_tree(nested);

        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        let names: Vec<_> = out.iter().map(|r| r.get("name").display_value()).collect();
        assert_eq!(names, vec!["Bob", "Charlie"]);
    }

    #[test]
    fn test_advanced_tree_is_anded() {
        let records = employees();
        let numbers = conditions::number_operand();
        let strings = conditions::string_operand();

        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        tree.push_expression(leaf("age", &numbers, "greaterThan", Some(26.into())));
        let mut advanced = FilteringExpressionsTree::new(FilteringLogic::And);
        advanced.push_expression(leaf("city", &strings, "startsWith", Some("New".into())));

        let out = filter(&records, Some(&tree), Some(&advanced), None, &ctx()).unwrap();
        let names: Vec<_> = out.iter().map(|r| r.get("name").display_value()).collect();
        assert_eq!(names, vec!["Alice", "Charlie"]);
    }

    #[test]
    fn test_unary_condition_ignores_search_value() {
        let records = vec![
            Record::from_pairs([("note", Value::Null)]),
            Record::from_pairs([("note", Value::from("present"))]),
        ];
        let strings = conditions::string_operand();
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        // Search value set on a unary condition must not change its result.
        tree.push_expression(leaf("note", &strings, "null", Some("ignored".into())));

        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].get("note").is_null());
    }

    #[test]
    fn test_unresolved_condition_fails_loudly() {
        let records = employees();
        let strings = conditions::string_operand();
        let mut expression = leaf("name", &strings, "contains", Some("A".into()));
        expression.condition = None;
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        tree.push_expression(expression);

        let err = filter(&records, Some(&tree), None, None, &ctx()).unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedCondition { .. }));
    }

    #[test]
    fn test_or_short_circuit_skips_deciding_children() {
        let records = employees();
        let strings = conditions::string_operand();

        // First child matches every record, second is unresolved. OR must
        // decide on the first child and never reach the broken leaf.
        let mut broken = leaf("name", &strings, "contains", None);
        broken.condition = None;

        let mut tree = FilteringExpressionsTree::new(FilteringLogic::Or);
        tree.push_expression(leaf("name", &strings, "notNull", None));
        tree.push_expression(broken);

        let out = filter(&records, Some(&tree), None, None, &ctx()).unwrap();
        assert_eq!(out.len(), records.len());
    }

    #[test]
    fn test_custom_strategy_overrides_field_read() {
        struct CityOnlyStrategy;
        impl FilteringStrategy for CityOnlyStrategy {
            // Every condition reads the city, whatever field it names.
            fn get_field_value(&self, record: &Record, _field_name: &str) -> Value {
                record.get("city").clone()
            }
        }

        let records = employees();
        let strings = conditions::string_operand();
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
        tree.push_expression(leaf("name", &strings, "contains", Some("York".into())));

        let out = filter(&records, Some(&tree), None, Some(&CityOnlyStrategy), &ctx()).unwrap();
        assert_eq!(out.len(), 2);
    }
}
