//! FILENAME: pipeline-engine/src/lib.rs
//! Data transformation pipeline for grid views.
//!
//! This crate turns a flat record collection into what a data grid renders:
//! filtered, sorted, grouped under headers, cell-merged and paged. It
//! depends on `grid-data` only for the record and scalar value types.
//!
//! Layers:
//! - `definition`: Serializable transformation state (what the view SHOULD show)
//! - `conditions`: Named predicate catalogs, one per column data type
//! - `filtering`/`sorting`/`grouping`/`merging`/`paging`: The stage engines
//! - `view`: Computed output slots (WHAT we display)
//! - `engine`: The orchestrator running the stages in order (HOW we compute)

pub mod definition;
pub mod conditions;
pub mod error;
pub mod filtering;
pub mod sorting;
pub mod grouping;
pub mod merging;
pub mod paging;
pub mod view;
pub mod engine;

pub use definition::*;
pub use view::*;
pub use conditions::{
    boolean_operand, date_operand, date_time_operand, number_operand, operand_for, string_operand,
    time_operand, ConditionContext, ConditionLogic, FieldDescriptor, FilteringOperand,
    FilteringOperation,
};
pub use engine::{recompute, recompute_active_rows, PipelineInputs};
pub use error::PipelineError;
pub use filtering::{DefaultFilteringStrategy, FilteringContext, FilteringStrategy};
pub use grouping::{DefaultGridGroupingStrategy, GridGroupingStrategy};
pub use merging::{DefaultMergeStrategy, MergeStrategy, NoopMergeStrategy};
pub use sorting::{
    DefaultGridSortingStrategy, DefaultSortingStrategy, GridSortingStrategy, SortingStrategy,
};
