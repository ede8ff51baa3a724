//! Service Layer Error Types

use crate::document::DocumentError;
use thiserror::Error;

/// Errors from the analysis service.
#[derive(Error, Debug)]
pub enum AnalysisServiceError {
    /// Referenced analysis does not exist
    #[error("Analysis '{id}' does not exist")]
    AnalysisNotFound { id: String },

    /// Document layer failure (missing nodes, corrupt chains, bad moves)
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Storage layer failure
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl AnalysisServiceError {
    /// Create an AnalysisNotFound error
    pub fn analysis_not_found(id: impl Into<String>) -> Self {
        Self::AnalysisNotFound { id: id.into() }
    }
}
