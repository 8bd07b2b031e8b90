//! FILENAME: grid-format/src/tree.rs
//! Filtering tree (de)serialization and rehydration.
//!
//! A serialized tree carries condition *names*, never condition functions.
//! On the way back in every leaf is resolved against the operand catalog of
//! its field's data type; a tree that skips this step cannot run. Search
//! values need the same treatment: JSON has no date type, so temporal
//! search values arrive as ISO text and are promoted to proper scalars
//! against the field catalog.

use pipeline_engine::conditions::{operand_for, FieldDescriptor};
use pipeline_engine::definition::{FilteringExpressionNode, FilteringExpressionsTree};

use crate::error::FormatError;

/// Serializes a tree to camelCase JSON.
pub fn tree_to_json(tree: &FilteringExpressionsTree) -> Result<String, FormatError> {
    Ok(serde_json::to_string(tree)?)
}

/// Parses a tree without resolving conditions. Running a tree straight
/// from here fails; callers almost always want `rehydrate_tree`.
pub fn tree_from_json(json: &str) -> Result<FilteringExpressionsTree, FormatError> {
    Ok(serde_json::from_str(json)?)
}

/// Parses a tree and resolves every leaf against the field catalog, so the
/// result is ready to run.
pub fn rehydrate_tree(
    json: &str,
    fields: &[FieldDescriptor],
) -> Result<FilteringExpressionsTree, FormatError> {
    let mut tree = tree_from_json(json)?;
    resolve_tree(&mut tree, fields)?;
    Ok(tree)
}

/// Resolves condition names and promotes temporal search values, depth
/// first. Fails on the first leaf naming an unknown field or condition;
/// the tree must not be run after an error.
pub fn resolve_tree(
    tree: &mut FilteringExpressionsTree,
    fields: &[FieldDescriptor],
) -> Result<(), FormatError> {
    for node in &mut tree.filtering_operands {
        match node {
            FilteringExpressionNode::Tree(sub_tree) => resolve_tree(sub_tree, fields)?,
            FilteringExpressionNode::Expression(leaf) => {
                let data_type = fields
                    .iter()
                    .find(|descriptor| descriptor.field == leaf.field_name)
                    .map(|descriptor| descriptor.data_type)
                    .ok_or_else(|| FormatError::UnknownField(leaf.field_name.clone()))?;

                let operand = operand_for(data_type);
                leaf.resolve(&operand)
                    .map_err(|_| FormatError::UnknownCondition {
                        name: leaf.condition_name.clone(),
                        field: leaf.field_name.clone(),
                        data_type,
                    })?;

                if let Some(search_val) = &leaf.search_val {
                    let promoted = search_val.promote(data_type).ok_or_else(|| {
                        FormatError::InvalidSearchValue {
                            field: leaf.field_name.clone(),
                            value: search_val.display_value(),
                            data_type,
                        }
                    })?;
                    leaf.search_val = Some(promoted);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use grid_data::{DataType, Record, Value};
    use pipeline_engine::conditions::string_operand;
    use pipeline_engine::definition::{FilteringExpression, FilteringLogic};
    use pipeline_engine::filtering::{filter, FilteringContext};

    fn catalog() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("name", DataType::String),
            FieldDescriptor::new("age", DataType::Number),
            FieldDescriptor::new("hired", DataType::Date),
        ]
    }

    fn hires() -> Vec<Record> {
        vec![
            Record::from_pairs([
                ("name", Value::from("Ann")),
                ("age", Value::from(34.0)),
                ("hired", Value::from(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())),
            ]),
            Record::from_pairs([
                ("name", Value::from("Bob")),
                ("age", Value::from(51.0)),
                ("hired", Value::from(NaiveDate::from_ymd_opt(2023, 11, 20).unwrap())),
            ]),
        ]
    }

    #[test]
    fn rehydrated_tree_filters_records() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "hired", "conditionName": "after", "searchVal": "2024-01-15"}
            ],
            "operator": 0
        }"#;

        let tree = rehydrate_tree(json, &catalog()).unwrap();
        let kept = filter(
            &hires(),
            Some(&tree),
            None,
            None,
            &FilteringContext::default(),
        )
        .unwrap();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("name"), &Value::from("Ann"));
    }

    #[test]
    fn rehydration_promotes_temporal_search_values() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "hired", "conditionName": "equals", "searchVal": "2024-03-01"}
            ],
            "operator": 0
        }"#;

        let tree = rehydrate_tree(json, &catalog()).unwrap();
        match &tree.filtering_operands[0] {
            FilteringExpressionNode::Expression(leaf) => {
                assert!(leaf.condition.is_some());
                assert_eq!(
                    leaf.search_val,
                    Some(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
                );
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn nested_sub_trees_resolve_depth_first() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "name", "conditionName": "contains", "searchVal": "o", "ignoreCase": true},
                {
                    "filteringOperands": [
                        {"fieldName": "age", "conditionName": "greaterThan", "searchVal": 40}
                    ],
                    "operator": 1
                }
            ],
            "operator": 0
        }"#;

        let tree = rehydrate_tree(json, &catalog()).unwrap();
        let kept = filter(
            &hires(),
            Some(&tree),
            None,
            None,
            &FilteringContext::default(),
        )
        .unwrap();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("name"), &Value::from("Bob"));
    }

    #[test]
    fn round_trip_preserves_the_tree_and_resolves_it() {
        let operand = string_operand();
        let mut tree = FilteringExpressionsTree::new(FilteringLogic::Or);
        tree.push_expression(
            FilteringExpression::new("name", &operand, "startsWith", Some("A".into()))
                .unwrap()
                .with_ignore_case(true),
        );

        let json = tree_to_json(&tree).unwrap();
        let back = rehydrate_tree(&json, &catalog()).unwrap();

        assert_eq!(back, tree);
        match &back.filtering_operands[0] {
            FilteringExpressionNode::Expression(leaf) => assert!(leaf.condition.is_some()),
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn unknown_field_is_a_typed_error() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "ghost", "conditionName": "equals", "searchVal": 1}
            ],
            "operator": 0
        }"#;

        let err = rehydrate_tree(json, &catalog()).unwrap_err();
        assert!(matches!(err, FormatError::UnknownField(field) if field == "ghost"));
    }

    #[test]
    fn unknown_condition_is_a_typed_error() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "name", "conditionName": "sparkles"}
            ],
            "operator": 0
        }"#;

        let err = rehydrate_tree(json, &catalog()).unwrap_err();
        match err {
            FormatError::UnknownCondition { name, field, data_type } => {
                assert_eq!(name, "sparkles");
                assert_eq!(field, "name");
                assert_eq!(data_type, DataType::String);
            }
            other => panic!("expected unknown condition, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_search_value_is_a_typed_error() {
        let json = r#"{
            "filteringOperands": [
                {"fieldName": "hired", "conditionName": "equals", "searchVal": "soon"}
            ],
            "operator": 0
        }"#;

        let err = rehydrate_tree(json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidSearchValue { ref value, .. } if value == "soon"
        ));
    }
}
