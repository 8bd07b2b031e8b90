//! FILENAME: pipeline-engine/src/merging.rs
//! Cell Merging Engine - Collapses vertical runs of equal cell values.
//!
//! Merging never reorders or rewrites rows. It produces a metadata arena
//! keyed by row index: the first row of a run of two or more equal values
//! becomes the root and carries the span, every later row of the run points
//! back at its root. Rows outside any run have no entry and span one.
//!
//! Two things break a run unconditionally: a group header row, and an
//! active row. An active row never joins the run above it and never roots
//! a multi-row run of its own, so the row under edit always stands alone.
//!
//! Activation changes are applied as diffs: `unmerge_active` recomputes
//! only the runs the active rows sit in and reports the rows whose
//! metadata actually changed. An empty diff means nothing to repaint.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use grid_data::Record;

use crate::definition::MergeColumn;
use crate::view::{GridRow, MergeCellMeta, MergeDiff, MergeResult, RowMergeMeta};

/// Owns run detection for a merge pass. The default is adjacent value
/// equality per designated column; override to merge on different rules.
pub trait MergeStrategy {
    fn merge(
        &self,
        rows: &[GridRow],
        columns: &[MergeColumn],
        active_rows: &[usize],
    ) -> MergeResult {
        merge_rows(rows, columns, active_rows)
    }

    fn unmerge_active(
        &self,
        rows: &[GridRow],
        columns: &[MergeColumn],
        active_rows: &[usize],
        current: &MergeResult,
    ) -> MergeDiff {
        diff_active_rows(rows, columns, active_rows, current)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMergeStrategy;

impl MergeStrategy for DefaultMergeStrategy {}

/// A strategy that never merges anything. Useful for switching merging
/// off without changing the pipeline shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMergeStrategy;

impl MergeStrategy for NoopMergeStrategy {
    fn merge(
        &self,
        rows: &[GridRow],
        _columns: &[MergeColumn],
        _active_rows: &[usize],
    ) -> MergeResult {
        MergeResult::unmerged(rows.len())
    }

    fn unmerge_active(
        &self,
        _rows: &[GridRow],
        _columns: &[MergeColumn],
        _active_rows: &[usize],
        _current: &MergeResult,
    ) -> MergeDiff {
        MergeDiff::default()
    }
}

/// Entry point used by the orchestrator and by callers merging manually.
pub fn merge(
    rows: &[GridRow],
    columns: &[MergeColumn],
    active_rows: &[usize],
    strategy: Option<&dyn MergeStrategy>,
) -> MergeResult {
    match strategy {
        Some(strategy) => strategy.merge(rows, columns, active_rows),
        None => DefaultMergeStrategy.merge(rows, columns, active_rows),
    }
}

/// Entry point for activation changes against an existing merge result.
pub fn unmerge_active(
    rows: &[GridRow],
    columns: &[MergeColumn],
    active_rows: &[usize],
    current: &MergeResult,
    strategy: Option<&dyn MergeStrategy>,
) -> MergeDiff {
    match strategy {
        Some(strategy) => strategy.unmerge_active(rows, columns, active_rows, current),
        None => DefaultMergeStrategy.unmerge_active(rows, columns, active_rows, current),
    }
}

/// Overwrites the metadata of every row the diff names. Rows outside the
/// diff keep their metadata, so applying an empty diff changes nothing.
pub fn apply_diff(result: &mut MergeResult, diff: &MergeDiff) {
    for (&row, meta) in &diff.changed {
        if let Some(slot) = result.by_row.get_mut(row) {
            *slot = meta.clone();
        }
    }
}

/// The stock full pass: scans every designated column top to bottom.
pub fn merge_rows(
    rows: &[GridRow],
    columns: &[MergeColumn],
    active_rows: &[usize],
) -> MergeResult {
    let mut result = MergeResult::unmerged(rows.len());
    if columns.is_empty() {
        return result;
    }
    let active: FxHashSet<usize> = active_rows.iter().copied().collect();
    for column in columns {
        merge_column(rows, column, &active, 0, rows.len(), &mut result.by_row);
    }
    result
}

/// Recomputes only the runs disturbed by the active rows and returns the
/// rows whose metadata changed.
pub fn diff_active_rows(
    rows: &[GridRow],
    columns: &[MergeColumn],
    active_rows: &[usize],
    current: &MergeResult,
) -> MergeDiff {
    let mut diff = MergeDiff::default();
    if active_rows.is_empty() || columns.is_empty() || current.by_row.is_empty() {
        return diff;
    }

    let active: FxHashSet<usize> = active_rows.iter().copied().collect();
    let mut touched: FxHashMap<usize, RowMergeMeta> = FxHashMap::default();

    for column in columns {
        // Every active row disturbs at most the one run it sits in.
        let mut roots: FxHashSet<usize> = FxHashSet::default();
        for &row in active_rows {
            match current.cell_meta(row, &column.field) {
                Some(MergeCellMeta::Root { .. }) => {
                    roots.insert(row);
                }
                Some(MergeCellMeta::Child { root }) => {
                    roots.insert(*root);
                }
                None => {}
            }
        }

        for root in roots {
            let span = match current.cell_meta(root, &column.field) {
                Some(MergeCellMeta::Root { row_span, .. }) => *row_span,
                _ => continue,
            };
            let end = (root + span).min(rows.len());

            // Start the window from its current metadata, minus this column.
            for row in root..end {
                touched
                    .entry(row)
                    .or_insert_with(|| current.by_row[row].clone())
                    .remove(&column.field);
            }
            merge_column(rows, column, &active, root, end, &mut touched);
        }
    }

    for (row, meta) in touched {
        if current.by_row.get(row) != Some(&meta) {
            diff.changed.insert(row, meta);
        }
    }
    diff
}

/// Scans `[start, end)` of one column, writing roots and children.
///
/// Generic over the destination because the full pass writes into a dense
/// per-row vector and the diff pass into a sparse working map.
fn merge_column<D: MetaSink>(
    rows: &[GridRow],
    column: &MergeColumn,
    active: &FxHashSet<usize>,
    start: usize,
    end: usize,
    destination: &mut D,
) {
    let mut row = start;
    while row < end {
        if active.contains(&row) {
            row += 1;
            continue;
        }
        let mut previous = match rows[row].as_record() {
            Some(record) => record,
            None => {
                row += 1;
                continue;
            }
        };

        let mut run_end = row + 1;
        while run_end < end {
            if active.contains(&run_end) {
                break;
            }
            let next = match rows[run_end].as_record() {
                Some(record) => record,
                None => break,
            };
            if !column_equal(column, previous, next) {
                break;
            }
            previous = next;
            run_end += 1;
        }

        if run_end - row > 1 {
            let child_rows: SmallVec<[usize; 4]> = (row + 1..run_end).collect();
            destination.set(
                row,
                &column.field,
                MergeCellMeta::Root {
                    row_span: run_end - row,
                    child_rows,
                },
            );
            for child in row + 1..run_end {
                destination.set(child, &column.field, MergeCellMeta::Child { root: row });
            }
        }
        row = run_end;
    }
}

fn column_equal(column: &MergeColumn, previous: &Record, current: &Record) -> bool {
    match column.comparer {
        Some(comparer) => comparer(previous, current, &column.field),
        // Value equality: null runs merge, NaN never equals itself.
        None => previous.get(&column.field) == current.get(&column.field),
    }
}

/// Destination for per-cell merge metadata.
trait MetaSink {
    fn set(&mut self, row: usize, field: &str, meta: MergeCellMeta);
}

impl MetaSink for Vec<RowMergeMeta> {
    fn set(&mut self, row: usize, field: &str, meta: MergeCellMeta) {
        self[row].insert(field.to_string(), meta);
    }
}

impl MetaSink for FxHashMap<usize, RowMergeMeta> {
    fn set(&mut self, row: usize, field: &str, meta: MergeCellMeta) {
        self.entry(row)
            .or_default()
            .insert(field.to_string(), meta);
    }
}
