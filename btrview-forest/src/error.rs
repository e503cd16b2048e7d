// SPDX-License-Identifier: GPL-3.0-only

use btrview_types::ParsePropertyError;
use thiserror::Error;

/// Error types for forest construction and display passes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("duplicate {field} {key}: '{first}' and '{second}' disagree")]
    DuplicateIdentity {
        field: &'static str,
        key: String,
        first: String,
        second: String,
    },

    #[error("cyclic lineage: {}", .chain.join(" -> "))]
    CyclicLineage { chain: Vec<String> },

    #[error("unknown property: {0}")]
    UnknownProperty(String),
}

impl From<ParsePropertyError> for ForestError {
    fn from(err: ParsePropertyError) -> Self {
        ForestError::UnknownProperty(err.0)
    }
}

/// Result type alias for forest operations
pub type Result<T> = std::result::Result<T, ForestError>;
