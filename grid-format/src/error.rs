//! FILENAME: grid-format/src/error.rs

use grid_data::DataType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("filtering tree names unknown field: {0}")]
    UnknownField(String),

    #[error("unknown condition '{name}' for field '{field}' ({data_type:?} catalog)")]
    UnknownCondition {
        name: String,
        field: String,
        data_type: DataType,
    },

    #[error("search value '{value}' on field '{field}' does not parse as {data_type:?}")]
    InvalidSearchValue {
        field: String,
        value: String,
        data_type: DataType,
    },
}
