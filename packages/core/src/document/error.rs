//! Document Layer Error Types
//!
//! Errors produced while maintaining chain invariants across insert,
//! delete, and move operations.

use crate::document::chain::ChainError;
use thiserror::Error;

/// Errors from the notebook document layer.
///
/// Corruption errors are always fatal for the affected operation and are
/// never auto-repaired; they carry the scope and offending node ids so the
/// inconsistent document can be diagnosed.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Referenced section does not exist
    #[error("Section '{id}' does not exist")]
    SectionNotFound { id: String },

    /// Referenced result does not exist
    #[error("Result '{id}' does not exist")]
    ResultNotFound { id: String },

    /// Referenced notebook does not exist
    #[error("Notebook '{id}' does not exist")]
    NotebookNotFound { id: String },

    /// A scope's chain violates the single-chain invariant
    ///
    /// Multiple heads or tails, a cycle, a dangling pointer, or a merge.
    /// The document is inconsistent and the caller must be told.
    #[error("Corrupt chain in {scope}: {source}")]
    CorruptChain { scope: String, source: ChainError },

    /// The requested move would corrupt the document and was rejected
    /// before any write
    #[error("Invalid move for node '{node_id}': {reason}")]
    InvalidMove { node_id: String, reason: String },

    /// Storage layer failure
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl DocumentError {
    /// Create a SectionNotFound error
    pub fn section_not_found(id: impl Into<String>) -> Self {
        Self::SectionNotFound { id: id.into() }
    }

    /// Create a ResultNotFound error
    pub fn result_not_found(id: impl Into<String>) -> Self {
        Self::ResultNotFound { id: id.into() }
    }

    /// Create a NotebookNotFound error
    pub fn notebook_not_found(id: impl Into<String>) -> Self {
        Self::NotebookNotFound { id: id.into() }
    }

    /// Create a CorruptChain error for the given scope
    pub fn corrupt_chain(scope: impl Into<String>, source: ChainError) -> Self {
        Self::CorruptChain {
            scope: scope.into(),
            source,
        }
    }

    /// Create an InvalidMove error
    pub fn invalid_move(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }
}
