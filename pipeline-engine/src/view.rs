//! FILENAME: pipeline-engine/src/view.rs
//! Pipeline View - Render-ready output of the transformation stages.
//!
//! The grouping engine interleaves synthetic group headers with data rows;
//! this module models that flat sequence as a proper sum type instead of a
//! duck-typed record soup, plus the merge-span arena and the state slots a
//! grid reads after a pipeline pass.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use grid_data::{Record, Value};

use crate::definition::{GroupKey, GroupingExpression, PagingState};

// ============================================================================
// FLAT ROWS & GROUP RECORDS
// ============================================================================

/// Index of a group record within the groups arena of its pass.
pub type GroupId = usize;

/// One row of a flat (render-ready) sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridRow {
    /// A source record, carried through the pipeline.
    Data(Record),
    /// A synthetic group boundary, pointing into the groups arena.
    GroupHeader(GroupId),
}

impl GridRow {
    pub fn is_group_header(&self) -> bool {
        matches!(self, GridRow::GroupHeader(_))
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            GridRow::Data(record) => Some(record),
            GridRow::GroupHeader(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<GroupId> {
        match self {
            GridRow::Data(_) => None,
            GridRow::GroupHeader(id) => Some(*id),
        }
    }
}

/// A synthetic group record. Created only by the grouping engine, recreated
/// on every pass, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// The grouping expression that produced this group.
    pub expression: GroupingExpression,

    /// The shared field value of the group's members.
    pub value: Value,

    /// Zero-based grouping depth.
    pub level: usize,

    /// Every data record under this group, including nested sub-groups'
    /// records, in grouped order.
    pub records: Vec<Record>,

    /// Expansion resolved against the grouping state at creation time.
    pub expanded: bool,

    /// Parent group in the arena, absent at the root level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_parent: Option<GroupId>,

    /// Full path from the root grouping level down to this group. This is
    /// the key expansion state is addressed by.
    pub hierarchy: SmallVec<[GroupKey; 4]>,
}

/// Output of a grouping pass: the visible flat sequence, the always-expanded
/// full sequence, their parallel owning-group metadata, and the arena of
/// group records in depth-first creation order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingResult {
    /// Render-visible rows: headers always (while their ancestors are
    /// expanded), children only under expanded groups.
    pub data: Vec<GridRow>,

    /// Owning group per visible row (the header's own group for header
    /// rows). `None` only on the ungrouped pass-through path.
    pub metadata: Vec<Option<GroupId>>,

    /// Every header and every data row, ignoring expansion state.
    pub full_data: Vec<GridRow>,

    pub full_metadata: Vec<Option<GroupId>>,

    /// Group records in depth-first creation order. Empty when grouping is
    /// off; replaced wholesale every pass.
    pub groups: Vec<GroupRecord>,
}

impl GroupingResult {
    /// The ungrouped identity pass-through: both sequences are the records,
    /// no headers, no groups.
    pub fn pass_through(records: &[Record]) -> Self {
        let rows: Vec<GridRow> = records.iter().cloned().map(GridRow::Data).collect();
        let metadata = vec![None; rows.len()];
        GroupingResult {
            data: rows.clone(),
            metadata: metadata.clone(),
            full_data: rows,
            full_metadata: metadata,
            groups: Vec::new(),
        }
    }
}

// ============================================================================
// MERGE METADATA
// ============================================================================

/// Merge state of one (row, column) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeCellMeta {
    /// First row of a run; carries the span and its absorbed rows.
    Root {
        row_span: usize,
        child_rows: SmallVec<[usize; 4]>,
    },
    /// Absorbed row, pointing back at its run root.
    Child { root: usize },
}

impl MergeCellMeta {
    pub fn root(row_span: usize) -> Self {
        MergeCellMeta::Root {
            row_span,
            child_rows: SmallVec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, MergeCellMeta::Root { .. })
    }
}

/// Per-row merge entries, keyed by column field name. Rows outside every
/// run have no entry for that column.
pub type RowMergeMeta = FxHashMap<String, MergeCellMeta>;

/// The merge arena of one pass: one entry slot per flat row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub by_row: Vec<RowMergeMeta>,
}

impl MergeResult {
    /// An arena with no runs at all, sized for `row_count` rows.
    pub fn unmerged(row_count: usize) -> Self {
        MergeResult {
            by_row: vec![RowMergeMeta::default(); row_count],
        }
    }

    pub fn cell_meta(&self, row: usize, field: &str) -> Option<&MergeCellMeta> {
        self.by_row.get(row).and_then(|meta| meta.get(field))
    }

    /// The span a renderer draws for a cell: run length on the root, zero
    /// on absorbed rows, one outside any run.
    pub fn row_span_at(&self, row: usize, field: &str) -> usize {
        match self.cell_meta(row, field) {
            Some(MergeCellMeta::Root { row_span, .. }) => *row_span,
            Some(MergeCellMeta::Child { .. }) => 0,
            None => 1,
        }
    }

    /// True when no cell of any row is part of a run.
    pub fn is_unmerged(&self) -> bool {
        self.by_row.iter().all(|meta| meta.is_empty())
    }
}

/// Outcome of a partial merge recomputation: only the rows whose metadata
/// actually changed. Rows absent from the diff are untouched; an empty diff
/// means the recomputation was a no-op.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergeDiff {
    pub changed: FxHashMap<usize, RowMergeMeta>,
}

impl MergeDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

// ============================================================================
// PIPELINE STATE SLOTS
// ============================================================================

/// Everything a pipeline pass writes, in the slots a grid reads them from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// After the filtering stage (export and printing features read this).
    pub filtered_data: Vec<Record>,

    /// After the sorting stage.
    pub filtered_sorted_data: Vec<Record>,

    /// Visible flat rows before paging.
    pub grouping_flat_result: Vec<GridRow>,

    /// Owning-group metadata parallel to `grouping_flat_result`.
    pub grouping_flat_metadata: Vec<Option<GroupId>>,

    /// Full (always expanded) flat rows.
    pub grouping_result: Vec<GridRow>,

    /// Owning-group metadata parallel to `grouping_result`.
    pub grouping_metadata: Vec<Option<GroupId>>,

    /// Group records of this pass, depth-first.
    pub groups_records: Vec<GroupRecord>,

    /// Merge arena addressed by position in `grouping_flat_result`.
    /// Activation-independent; active rows live in `active_merge_diff`.
    pub merge_result: MergeResult,

    /// Overlay for the current active rows, applied on top of
    /// `merge_result`. Replaced when activation changes, so the arena
    /// itself never needs recomputing for activation alone.
    pub active_merge_diff: MergeDiff,

    /// Paging state after correction, with result metadata filled.
    /// `None` when paging is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging_state: Option<PagingState>,

    /// Offset of the first view row within `grouping_flat_result`; merge
    /// metadata for view row `i` lives at `page_start + i`.
    pub page_start: usize,

    /// The rows the grid renders.
    pub view_data: Vec<GridRow>,

    /// Owning-group metadata parallel to `view_data`.
    pub view_metadata: Vec<Option<GroupId>>,
}

impl PipelineState {
    /// Merge metadata of a flat row, with the activation overlay applied.
    pub fn merge_meta_at(&self, flat_row: usize) -> Option<&RowMergeMeta> {
        match self.active_merge_diff.changed.get(&flat_row) {
            Some(meta) => Some(meta),
            None => self.merge_result.by_row.get(flat_row),
        }
    }

    /// Merge metadata of a view row, resolved through the page offset.
    pub fn view_merge_meta(&self, view_row: usize) -> Option<&RowMergeMeta> {
        self.merge_meta_at(self.page_start + view_row)
    }

    /// The span a renderer draws for a view cell. A root of a run spanning
    /// beyond the page end still reports its full length; the renderer
    /// clamps against the page it draws.
    pub fn view_row_span(&self, view_row: usize, field: &str) -> usize {
        match self.view_merge_meta(view_row).and_then(|meta| meta.get(field)) {
            Some(MergeCellMeta::Root { row_span, .. }) => *row_span,
            Some(MergeCellMeta::Child { .. }) => 0,
            None => 1,
        }
    }
}
