//! FILENAME: grid-format/src/lib.rs
//! Grid Format Module
//!
//! Saves and restores grid view state as camelCase JSON: filtering trees,
//! sort keys, grouping and paging. Restoring resolves condition names back
//! into runnable conditions against a field catalog.

mod error;
mod state;
mod tree;

pub use error::FormatError;
pub use state::GridStateDocument;
pub use tree::{rehydrate_tree, resolve_tree, tree_from_json, tree_to_json};
