//! FILENAME: grid-format/src/state.rs
//! Whole-view state document: every serializable pipeline input in one
//! JSON object, for saving a grid view and restoring it later.
//!
//! Merge state is deliberately absent. Merge columns carry comparer
//! functions, which cannot travel; callers re-designate them from column
//! configuration after a restore.

use serde::{Deserialize, Serialize};

use pipeline_engine::conditions::FieldDescriptor;
use pipeline_engine::definition::{
    FilteringExpressionsTree, GroupingState, PagingState, SortingExpression,
};

use crate::error::FormatError;
use crate::tree;

/// The declarative view state of one grid. Every feature is optional;
/// absent features are left untouched on restore.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering: Option<FilteringExpressionsTree>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_filtering: Option<FilteringExpressionsTree>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Vec<SortingExpression>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupingState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<PagingState>,
}

impl GridStateDocument {
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a document and rehydrates both filtering trees against the
    /// field catalog, so the restored state is ready to run.
    pub fn from_json(json: &str, fields: &[FieldDescriptor]) -> Result<Self, FormatError> {
        let mut document: GridStateDocument = serde_json::from_str(json)?;
        if let Some(filtering) = &mut document.filtering {
            tree::resolve_tree(filtering, fields)?;
        }
        if let Some(advanced) = &mut document.advanced_filtering {
            tree::resolve_tree(advanced, fields)?;
        }
        Ok(document)
    }
}
