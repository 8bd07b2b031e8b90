//! FILENAME: pipeline-engine/benches/pipeline_stages.rs
//! Benchmarks for a full pipeline pass and for the partial merge path.
//!
//! The interesting comparison is `full_merge` against `unmerge_active_diff`:
//! the diff path re-scans only the runs the active rows sit in, so it should
//! stay flat while the full pass grows with the row count.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_data::{Record, Value};
use pipeline_engine::{
    conditions, merging, recompute, FilteringExpression, FilteringExpressionsTree, FilteringLogic,
    GroupingExpression, GroupingState, MergeColumn, MergeMode, PagingState, PipelineInputs,
    SortingDirection, SortingExpression,
};

fn bench_rows() -> usize {
    std::env::var("PIPELINE_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (10_000..=1_000_000).contains(&v))
        .unwrap_or(100_000)
}

/// Employee-shaped records with low-cardinality dept/city columns, so
/// grouping yields few groups and merging yields long runs.
fn build_records(rows: usize) -> Vec<Record> {
    (0..rows)
        .map(|i| {
            Record::from_pairs([
                ("name", Value::from(format!("Emp_{i:06}"))),
                ("dept", Value::from(format!("Dept_{}", i % 8))),
                ("city", Value::from(format!("City_{:02}", i % 25))),
                ("salary", Value::from(((i * 37) % 90_000) as f64 + 10_000.0)),
            ])
        })
        .collect()
}

fn bench_pipeline_stages(c: &mut Criterion) {
    let rows = bench_rows();
    let records = build_records(rows);

    let operand = conditions::number_operand();
    let mut tree = FilteringExpressionsTree::new(FilteringLogic::And);
    tree.push_expression(
        FilteringExpression::new(
            "salary",
            &operand,
            "greaterThanOrEqualTo",
            Some(Value::from(20_000.0)),
        )
        .unwrap(),
    );
    let sorting = vec![SortingExpression::new("city", SortingDirection::Asc)];
    let grouping = GroupingState::new(vec![GroupingExpression::new("dept", SortingDirection::Asc)]);
    let merge_columns = vec![MergeColumn::new("city")];
    let paging = PagingState::new(3, 50);

    let mut inputs = PipelineInputs::new(&records);
    inputs.filtering_tree = Some(&tree);
    inputs.sorting_expressions = &sorting;
    inputs.grouping = Some(&grouping);
    inputs.merge_columns = &merge_columns;
    inputs.merge_mode = MergeMode::OnSort;
    inputs.paging = Some(&paging);

    // Sanity check: the pass yields a full page and real merge runs.
    let state = recompute(&inputs).unwrap();
    assert_eq!(state.view_data.len(), 50);
    assert!(!state.merge_result.is_unmerged());

    // And the diff path disturbs a couple of runs, not the whole arena.
    // The first merged row is the root of a run, so the row after it is
    // guaranteed to sit inside one.
    let first_merged = state
        .merge_result
        .by_row
        .iter()
        .position(|meta| meta.contains_key("city"))
        .unwrap();
    let active = [first_merged + 1];
    let diff = merging::unmerge_active(
        &state.grouping_flat_result,
        &merge_columns,
        &active,
        &state.merge_result,
        None,
    );
    assert!(!diff.is_empty());
    assert!(diff.changed.len() < state.merge_result.by_row.len() / 10);

    let mut group = c.benchmark_group("pipeline_stages");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_with_input(BenchmarkId::new("full_recompute", rows), &rows, |b, _| {
        b.iter(|| {
            let state = recompute(&inputs).unwrap();
            black_box(state);
        })
    });

    group.bench_with_input(BenchmarkId::new("full_merge", rows), &rows, |b, _| {
        b.iter(|| {
            let result = merging::merge(&state.grouping_flat_result, &merge_columns, &[], None);
            black_box(result);
        })
    });

    group.bench_with_input(
        BenchmarkId::new("unmerge_active_diff", rows),
        &rows,
        |b, _| {
            b.iter(|| {
                let diff = merging::unmerge_active(
                    &state.grouping_flat_result,
                    &merge_columns,
                    &active,
                    &state.merge_result,
                    None,
                );
                black_box(diff);
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_pipeline_stages);
criterion_main!(benches);
