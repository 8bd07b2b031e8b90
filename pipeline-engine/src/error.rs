//! FILENAME: pipeline-engine/src/error.rs

use thiserror::Error;

/// Configuration errors raised by the pipeline.
///
/// These are programmer errors: a silent fallback (empty or unfiltered
/// output) would corrupt what the user sees without any signal, so the
/// engines refuse to run instead. State-level problems such as an
/// out-of-range page index are clamped locally and never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("unknown filtering condition: {0}")]
    UnknownCondition(String),

    #[error("filtering expression on field '{field}' has no resolved condition (name: '{name}')")]
    UnresolvedCondition { field: String, name: String },

    #[error("condition '{name}' requires a search value")]
    MissingSearchValue { name: String },
}
