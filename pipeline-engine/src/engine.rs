//! FILENAME: pipeline-engine/src/engine.rs
//! Pipeline Orchestrator - Composes the stage engines into one pass.
//!
//! `recompute` takes the declarative inputs (records plus filter, sort,
//! group, merge and page state) and fills every slot of a `PipelineState`.
//! There is no cache and no dirty tracking: the same inputs always produce
//! the same state, and the caller re-invokes when an input changes.
//!
//! Stage order is fixed:
//! 1. Filter records against the primary and advanced condition trees
//! 2. Sort with grouping keys prepended, so group membership dominates
//! 3. Group into header-interleaved flat rows (visible and full variants)
//! 4. Merge designated columns over the visible rows, writing the
//!    activation-independent arena plus the active-row overlay diff
//! 5. Correct the paging state and slice rows and metadata into the view
//!
//! Activation changes alone do not need a full pass: `recompute_active_rows`
//! rewrites just the overlay against the arena of the last pass.

use grid_data::Record;

use crate::definition::{
    FilteringExpressionsTree, GroupingState, MergeColumn, MergeMode, PagingMode, PagingState,
    SortingExpression,
};
use crate::error::PipelineError;
use crate::filtering::{self, FilteringContext, FilteringStrategy};
use crate::grouping::{self, GridGroupingStrategy};
use crate::merging::{self, MergeStrategy};
use crate::paging;
use crate::sorting::{self, GridSortingStrategy};
use crate::view::{GroupingResult, PipelineState};

// ============================================================================
// INPUTS
// ============================================================================

/// Everything one pipeline pass reads. Strategies are borrowed seams; the
/// stock engines run wherever a strategy is absent.
pub struct PipelineInputs<'a> {
    /// The source collection. Never mutated; every stage works on copies.
    pub records: &'a [Record],

    /// Primary filtering tree (a grid's filter row state).
    pub filtering_tree: Option<&'a FilteringExpressionsTree>,

    /// Advanced filtering tree, ANDed with the primary tree.
    pub advanced_tree: Option<&'a FilteringExpressionsTree>,

    pub filtering_strategy: Option<&'a dyn FilteringStrategy>,

    /// Clock and per-pass inputs for condition evaluation.
    pub filtering_context: FilteringContext,

    /// Explicit sort keys. Grouping keys always run ahead of these.
    pub sorting_expressions: &'a [SortingExpression],

    pub sorting_strategy: Option<&'a dyn GridSortingStrategy>,

    /// Grouping configuration; absent means no grouping at all.
    pub grouping: Option<&'a GroupingState>,

    pub grouping_strategy: Option<&'a dyn GridGroupingStrategy>,

    /// Columns designated for cell merging, before mode filtering.
    pub merge_columns: &'a [MergeColumn],

    pub merge_mode: MergeMode,

    pub merge_strategy: Option<&'a dyn MergeStrategy>,

    /// Rows under active edit, as indexes into the visible flat sequence
    /// (pre-paging). Active rows never sit inside a merge run.
    pub active_rows: &'a [usize],

    /// Paging request; absent means paging is off.
    pub paging: Option<&'a PagingState>,

    pub paging_mode: PagingMode,
}

impl<'a> PipelineInputs<'a> {
    /// Inputs that pass the records through untouched. Callers fill in the
    /// stages they use.
    pub fn new(records: &'a [Record]) -> Self {
        PipelineInputs {
            records,
            filtering_tree: None,
            advanced_tree: None,
            filtering_strategy: None,
            filtering_context: FilteringContext::default(),
            sorting_expressions: &[],
            sorting_strategy: None,
            grouping: None,
            grouping_strategy: None,
            merge_columns: &[],
            merge_mode: MergeMode::default(),
            merge_strategy: None,
            active_rows: &[],
            paging: None,
            paging_mode: PagingMode::default(),
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Runs one full pass and returns the freshly computed state. Every slot is
/// replaced wholesale, so nothing from an earlier pass can leak through.
pub fn recompute(inputs: &PipelineInputs) -> Result<PipelineState, PipelineError> {
    let mut state = PipelineState::default();

    // Step 1: filter against both trees.
    state.filtered_data = filtering::filter(
        inputs.records,
        inputs.filtering_tree,
        inputs.advanced_tree,
        inputs.filtering_strategy,
        &inputs.filtering_context,
    )?;

    // Step 2: sort with grouping keys ahead of the explicit sort keys, so
    // rows of one group stay contiguous and the explicit keys order rows
    // within each group.
    let sort_keys = full_sort_keys(inputs);
    state.filtered_sorted_data =
        sorting::sort(&state.filtered_data, &sort_keys, inputs.sorting_strategy);

    // Step 3: group into flat header-interleaved rows.
    let grouped = match inputs.grouping {
        Some(grouping_state) => grouping::group_by(
            &state.filtered_sorted_data,
            grouping_state,
            inputs.sorting_strategy,
            inputs.grouping_strategy,
        ),
        None => GroupingResult::pass_through(&state.filtered_sorted_data),
    };
    state.grouping_flat_result = grouped.data;
    state.grouping_flat_metadata = grouped.metadata;
    state.grouping_result = grouped.full_data;
    state.grouping_metadata = grouped.full_metadata;
    state.groups_records = grouped.groups;

    // Step 4: merge over the visible rows. The arena ignores activation;
    // active rows land in the overlay diff, so an activation change later
    // only has to rewrite the overlay.
    let merge_columns = merge_columns_for_mode(inputs);
    state.merge_result = merging::merge(
        &state.grouping_flat_result,
        &merge_columns,
        &[],
        inputs.merge_strategy,
    );
    state.active_merge_diff = merging::unmerge_active(
        &state.grouping_flat_result,
        &merge_columns,
        inputs.active_rows,
        &state.merge_result,
        inputs.merge_strategy,
    );

    // Step 5: page rows and group metadata identically so they stay
    // positionally aligned.
    apply_paging(&mut state, inputs);

    Ok(state)
}

/// Rewrites the merge overlay for a changed activation set without running
/// the pipeline again. The arena in `merge_result` stays untouched, so rows
/// dropped from the set fall back to their canonical runs. Everything else
/// in the state is left alone; callers must run `recompute` when any other
/// input changes.
pub fn recompute_active_rows(state: &mut PipelineState, inputs: &PipelineInputs) {
    let merge_columns = merge_columns_for_mode(inputs);
    state.active_merge_diff = merging::unmerge_active(
        &state.grouping_flat_result,
        &merge_columns,
        inputs.active_rows,
        &state.merge_result,
        inputs.merge_strategy,
    );
}

// ============================================================================
// STAGE GLUE
// ============================================================================

/// Grouping expressions become the leading sort keys; explicit sort keys
/// break ties inside each group.
fn full_sort_keys(inputs: &PipelineInputs) -> Vec<SortingExpression> {
    let mut keys: Vec<SortingExpression> = inputs
        .grouping
        .map(|state| state.expressions.iter().map(|e| e.to_sorting()).collect())
        .unwrap_or_default();
    keys.extend(inputs.sorting_expressions.iter().cloned());
    keys
}

/// The designated columns the current mode lets merge. OnSort keeps only
/// columns named by a sort or grouping expression.
fn merge_columns_for_mode(inputs: &PipelineInputs) -> Vec<MergeColumn> {
    match inputs.merge_mode {
        MergeMode::Always => inputs.merge_columns.to_vec(),
        MergeMode::OnSort => inputs
            .merge_columns
            .iter()
            .filter(|column| field_is_sorted(inputs, &column.field))
            .cloned()
            .collect(),
    }
}

fn field_is_sorted(inputs: &PipelineInputs, field: &str) -> bool {
    inputs
        .sorting_expressions
        .iter()
        .any(|e| e.field_name == field)
        || inputs
            .grouping
            .map_or(false, |state| {
                state.expressions.iter().any(|e| e.field_name == field)
            })
}

fn apply_paging(state: &mut PipelineState, inputs: &PipelineInputs) {
    let local = matches!(inputs.paging_mode, PagingMode::Local);
    match inputs.paging {
        Some(request) if local => {
            let mut paging_state = request.clone();
            // Correction runs first, so a stale index from a shrunk result
            // set clamps to the last page instead of erroring.
            paging::correct_paging_state(&mut paging_state, state.grouping_flat_result.len());
            state.view_data = paging::page(&state.grouping_flat_result, &mut paging_state);
            state.view_metadata = paging::page(&state.grouping_flat_metadata, &mut paging_state);
            state.page_start =
                paging::page_window(&paging_state, state.grouping_flat_result.len()).0;
            state.paging_state = Some(paging_state);
        }
        other => {
            // Paging off, or delegated to a remote source.
            state.view_data = state.grouping_flat_result.clone();
            state.view_metadata = state.grouping_flat_metadata.clone();
            state.page_start = 0;
            state.paging_state = other.cloned();
        }
    }
}
