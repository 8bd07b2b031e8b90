//! FILENAME: pipeline-engine/src/definition.rs
//! Pipeline Definition - The serializable transformation state.
//!
//! This module contains all the types needed to DESCRIBE what the pipeline
//! should do to a record collection. These structures are designed to be:
//! - Serializable (filter/sort/group/page state travels as camelCase JSON)
//! - Immutable snapshots of caller intent
//! - Free of any computation (the engines interpret them)
//!
//! Condition functions and strategy objects are deliberately not part of the
//! wire shape: a deserialized filtering tree carries condition *names* only
//! and must be rehydrated against column types before it can run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use grid_data::{Record, Value};

use crate::conditions::FilteringOperand;
use crate::conditions::FilteringOperation;
use crate::error::PipelineError;
use crate::sorting::SortingStrategy;

// ============================================================================
// FILTERING
// ============================================================================

/// Boolean combinator for an expression tree.
/// Serialized numerically (And = 0, Or = 1) to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FilteringLogic {
    And = 0,
    Or = 1,
}

impl From<FilteringLogic> for u8 {
    fn from(logic: FilteringLogic) -> u8 {
        logic as u8
    }
}

impl TryFrom<u8> for FilteringLogic {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FilteringLogic::And),
            1 => Ok(FilteringLogic::Or),
            other => Err(format!("invalid filtering logic: {}", other)),
        }
    }
}

impl Default for FilteringLogic {
    fn default() -> Self {
        FilteringLogic::And
    }
}

/// A leaf of the filtering tree: one condition applied to one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringExpression {
    /// Field the condition reads from the record.
    pub field_name: String,

    /// Name of the condition within the field's operand catalog.
    /// This is the serialized identity of the condition.
    pub condition_name: String,

    /// The resolved condition. Never serialized; filled at construction
    /// or by rehydration. Running a tree with unresolved leaves is a
    /// configuration error.
    #[serde(skip)]
    pub condition: Option<FilteringOperation>,

    /// Value the condition compares against. Unary conditions ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_val: Option<Value>,

    /// Lower-cases both operands of string conditions. Never inferred:
    /// callers must set it explicitly, absent means case-sensitive.
    #[serde(default)]
    pub ignore_case: bool,
}

impl FilteringExpression {
    /// Creates a leaf and resolves its condition from `operand`.
    /// Fails loudly when the name is not in the catalog.
    pub fn new(
        field_name: impl Into<String>,
        operand: &FilteringOperand,
        condition_name: &str,
        search_val: Option<Value>,
    ) -> Result<Self, PipelineError> {
        let condition = operand
            .condition(condition_name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownCondition(condition_name.to_string()))?;
        Ok(FilteringExpression {
            field_name: field_name.into(),
            condition_name: condition_name.to_string(),
            condition: Some(condition),
            search_val,
            ignore_case: false,
        })
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Resolves the condition by name against an operand catalog.
    /// Used by rehydration after deserializing a tree.
    pub fn resolve(&mut self, operand: &FilteringOperand) -> Result<(), PipelineError> {
        let condition = operand
            .condition(&self.condition_name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownCondition(self.condition_name.clone()))?;
        self.condition = Some(condition);
        Ok(())
    }
}

impl PartialEq for FilteringExpression {
    /// Equality over the serializable identity of the leaf; the resolved
    /// condition function is derived state and does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.field_name == other.field_name
            && self.condition_name == other.condition_name
            && self.search_val == other.search_val
            && self.ignore_case == other.ignore_case
    }
}

/// One child of a filtering tree: either a leaf or a nested sub-tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilteringExpressionNode {
    Expression(FilteringExpression),
    Tree(FilteringExpressionsTree),
}

/// A boolean AND/OR tree of filtering conditions.
///
/// Invariant: a tree with zero operands matches every record (neutral
/// element), so "no filter" and "empty filter" behave identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringExpressionsTree {
    /// Children, evaluated under `operator`. Order is evaluation order;
    /// AND/OR short-circuit left to right.
    pub filtering_operands: Vec<FilteringExpressionNode>,

    pub operator: FilteringLogic,

    /// Set on per-column trees assembled by a grid's filter row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

impl FilteringExpressionsTree {
    pub fn new(operator: FilteringLogic) -> Self {
        FilteringExpressionsTree {
            filtering_operands: Vec::new(),
            operator,
            field_name: None,
        }
    }

    pub fn for_field(operator: FilteringLogic, field_name: impl Into<String>) -> Self {
        FilteringExpressionsTree {
            filtering_operands: Vec::new(),
            operator,
            field_name: Some(field_name.into()),
        }
    }

    pub fn push_expression(&mut self, expression: FilteringExpression) {
        self.filtering_operands
            .push(FilteringExpressionNode::Expression(expression));
    }

    pub fn push_tree(&mut self, tree: FilteringExpressionsTree) {
        self.filtering_operands
            .push(FilteringExpressionNode::Tree(tree));
    }

    pub fn is_empty(&self) -> bool {
        self.filtering_operands.is_empty()
    }
}

impl Default for FilteringExpressionsTree {
    fn default() -> Self {
        Self::new(FilteringLogic::And)
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortingDirection {
    Asc,
    Desc,
}

impl Default for SortingDirection {
    fn default() -> Self {
        SortingDirection::Asc
    }
}

/// One sort key. A sort request is an ordered list of these, first entry
/// is the primary key and later entries break ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingExpression {
    pub field_name: String,

    pub dir: SortingDirection,

    /// Lower-cases text values before comparison.
    #[serde(default)]
    pub ignore_case: bool,

    /// Optional per-key comparator override. When absent the sort uses the
    /// strategy injected into the sorting pass.
    #[serde(skip)]
    pub strategy: Option<Arc<dyn SortingStrategy>>,
}

impl SortingExpression {
    pub fn new(field_name: impl Into<String>, dir: SortingDirection) -> Self {
        SortingExpression {
            field_name: field_name.into(),
            dir,
            ignore_case: false,
            strategy: None,
        }
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SortingStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

impl PartialEq for SortingExpression {
    fn eq(&self, other: &Self) -> bool {
        self.field_name == other.field_name
            && self.dir == other.dir
            && self.ignore_case == other.ignore_case
    }
}

// ============================================================================
// GROUPING
// ============================================================================

/// A grouping key: same shape as a sort key. Grouping expressions are
/// always prepended ahead of explicit sort expressions so group membership
/// dominates intra-group order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingExpression {
    pub field_name: String,

    pub dir: SortingDirection,

    #[serde(default)]
    pub ignore_case: bool,
}

impl GroupingExpression {
    pub fn new(field_name: impl Into<String>, dir: SortingDirection) -> Self {
        GroupingExpression {
            field_name: field_name.into(),
            dir,
            ignore_case: false,
        }
    }

    /// The equivalent sort key, for delegation to the sorting engine.
    pub fn to_sorting(&self) -> SortingExpression {
        SortingExpression {
            field_name: self.field_name.clone(),
            dir: self.dir,
            ignore_case: self.ignore_case,
            strategy: None,
        }
    }
}

/// One step of a group hierarchy path: which field, which value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub field_name: String,
    pub value: Value,
}

impl GroupKey {
    pub fn new(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        GroupKey {
            field_name: field_name.into(),
            value: value.into(),
        }
    }
}

/// Expansion override for one group, addressed by its full hierarchy path
/// from the root grouping level down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExpandState {
    pub hierarchy: SmallVec<[GroupKey; 4]>,
    pub expanded: bool,
}

/// Everything the grouping engine needs besides the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingState {
    pub expressions: Vec<GroupingExpression>,

    /// Per-group expansion overrides. Groups not listed here fall back to
    /// `default_expanded`.
    #[serde(default)]
    pub expansion: Vec<GroupExpandState>,

    #[serde(default = "default_true")]
    pub default_expanded: bool,
}

impl GroupingState {
    pub fn new(expressions: Vec<GroupingExpression>) -> Self {
        GroupingState {
            expressions,
            expansion: Vec::new(),
            default_expanded: true,
        }
    }

    /// Looks up the expansion flag for a hierarchy path.
    pub fn expansion_for(&self, hierarchy: &[GroupKey]) -> bool {
        for state in &self.expansion {
            if state.hierarchy.as_slice() == hierarchy {
                return state.expanded;
            }
        }
        self.default_expanded
    }
}

impl Default for GroupingState {
    fn default() -> Self {
        GroupingState::new(Vec::new())
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// MERGING
// ============================================================================

/// Per-column merge equality override: previous record, current record,
/// field name. Returning true joins the current row into the previous run.
pub type MergeComparer = fn(&Record, &Record, &str) -> bool;

/// When cell merging applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeMode {
    /// Merge every designated column.
    Always,
    /// Merge only designated columns that participate in the current sort
    /// (grouping expressions count as sort participation).
    OnSort,
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::OnSort
    }
}

/// A column designated for cell merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeColumn {
    pub field: String,

    /// Custom run equality for this column. Defaults to value equality
    /// with null equal to null.
    #[serde(skip)]
    pub comparer: Option<MergeComparer>,
}

impl MergeColumn {
    pub fn new(field: impl Into<String>) -> Self {
        MergeColumn {
            field: field.into(),
            comparer: None,
        }
    }

    pub fn with_comparer(mut self, comparer: MergeComparer) -> Self {
        self.comparer = Some(comparer);
        self
    }
}

impl PartialEq for MergeColumn {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
    }
}

// ============================================================================
// PAGING
// ============================================================================

/// Validation outcome of a paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PagingError {
    None,
    IncorrectPageIndex,
    IncorrectRecordsPerPage,
}

impl Default for PagingError {
    fn default() -> Self {
        PagingError::None
    }
}

/// Result metadata written by every paging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingMetadata {
    pub count_pages: usize,
    pub count_records: usize,
    pub error: PagingError,
}

/// Where pagination happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PagingMode {
    /// The pipeline slices the data itself.
    Local,
    /// An external source pages; the paging stage passes through.
    Remote,
}

impl Default for PagingMode {
    fn default() -> Self {
        PagingMode::Local
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingState {
    /// Zero-based page index.
    pub index: usize,

    pub records_per_page: usize,

    /// Filled by the paging engine on every call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PagingMetadata>,
}

impl PagingState {
    pub fn new(index: usize, records_per_page: usize) -> Self {
        PagingState {
            index,
            records_per_page,
            metadata: None,
        }
    }
}
