//! FILENAME: pipeline-engine/src/grouping.rs
//! Grouping Engine - Partitions sorted records into header-interleaved rows.
//!
//! Grouping is sorting plus a deterministic partition: records are ordered
//! by the grouping expressions, then each maximal run of equal key values
//! becomes a group. Nested expressions partition recursively inside their
//! parent run.
//!
//! Every pass produces two flat sequences: the full one (always expanded,
//! position-independent of UI state) and the visible one (headers of
//! collapsed groups stay, their descendants go). Both carry a parallel
//! owning-group metadata sequence, and the group records themselves land in
//! an arena in depth-first creation order.

use grid_data::Record;
use smallvec::SmallVec;

use crate::definition::{GroupKey, GroupingState};
use crate::sorting::{self, compare_fields, GridSortingStrategy};
use crate::view::{GridRow, GroupId, GroupRecord, GroupingResult};

/// Owns a whole grouping pass. The default implementation is the
/// sort-then-partition algorithm; a custom one can regroup however it
/// wants without touching the engine.
pub trait GridGroupingStrategy {
    fn group_by(
        &self,
        records: &[Record],
        state: &GroupingState,
        sorting_strategy: Option<&dyn GridSortingStrategy>,
    ) -> GroupingResult {
        group_records(records, state, sorting_strategy)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGridGroupingStrategy;

impl GridGroupingStrategy for DefaultGridGroupingStrategy {}

/// Entry point used by the orchestrator and by callers grouping manually.
pub fn group_by(
    records: &[Record],
    state: &GroupingState,
    sorting_strategy: Option<&dyn GridSortingStrategy>,
    grouping_strategy: Option<&dyn GridGroupingStrategy>,
) -> GroupingResult {
    match grouping_strategy {
        Some(strategy) => strategy.group_by(records, state, sorting_strategy),
        None => DefaultGridGroupingStrategy.group_by(records, state, sorting_strategy),
    }
}

/// The stock pass: sort by the grouping expressions, partition recursively.
pub fn group_records(
    records: &[Record],
    state: &GroupingState,
    sorting_strategy: Option<&dyn GridSortingStrategy>,
) -> GroupingResult {
    if state.expressions.is_empty() {
        return GroupingResult::pass_through(records);
    }

    let sort_expressions: Vec<_> = state.expressions.iter().map(|e| e.to_sorting()).collect();
    let sorted = sorting::sort(records, &sort_expressions, sorting_strategy);

    let mut result = GroupingResult::default();
    partition_level(&sorted, state, 0, None, &[], true, &mut result);
    result
}

/// Partitions one level of the hierarchy within an already-sorted slice.
///
/// `visible` is true while every ancestor group is expanded; it gates what
/// reaches the visible sequence. The full sequence ignores it.
fn partition_level(
    records: &[Record],
    state: &GroupingState,
    level: usize,
    parent: Option<GroupId>,
    parent_hierarchy: &[GroupKey],
    visible: bool,
    result: &mut GroupingResult,
) {
    let expression = &state.expressions[level];
    let sort_key = expression.to_sorting();
    let last_level = level + 1 == state.expressions.len();

    let mut start = 0;
    while start < records.len() {
        // Extend the run while the grouping key compares equal.
        let mut end = start + 1;
        while end < records.len()
            && compare_fields(&records[start], &records[end], &sort_key).is_eq()
        {
            end += 1;
        }
        let run = &records[start..end];

        let mut hierarchy: SmallVec<[GroupKey; 4]> = parent_hierarchy.iter().cloned().collect();
        hierarchy.push(GroupKey {
            field_name: expression.field_name.clone(),
            value: run[0].get(&expression.field_name).clone(),
        });
        let expanded = state.expansion_for(&hierarchy);

        let group_id = result.groups.len();
        result.groups.push(GroupRecord {
            expression: expression.clone(),
            value: run[0].get(&expression.field_name).clone(),
            level,
            records: run.to_vec(),
            expanded,
            group_parent: parent,
            hierarchy: hierarchy.clone(),
        });

        result.full_data.push(GridRow::GroupHeader(group_id));
        result.full_metadata.push(Some(group_id));
        if visible {
            result.data.push(GridRow::GroupHeader(group_id));
            result.metadata.push(Some(group_id));
        }

        let children_visible = visible && expanded;
        if last_level {
            for record in run {
                result.full_data.push(GridRow::Data(record.clone()));
                result.full_metadata.push(Some(group_id));
                if children_visible {
                    result.data.push(GridRow::Data(record.clone()));
                    result.metadata.push(Some(group_id));
                }
            }
        } else {
            partition_level(
                run,
                state,
                level + 1,
                Some(group_id),
                &hierarchy,
                children_visible,
                result,
            );
        }

        start = end;
    }
}
