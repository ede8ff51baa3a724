//! Notebook and Analysis Containers
//!
//! A [`Notebook`] is the root document owning a forest of top-level
//! sections; an [`Analysis`] is the user-facing object that owns exactly
//! one notebook (created together, deleted together) plus presentation
//! metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root container for one ordered document.
///
/// The notebook carries no ordering fields of its own: its top-level
/// sections (those with `parent_section_id = None`) form one chain whose
/// head is discovered by scanning, not by a stored head pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    /// Unique identifier (UUID)
    pub id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Notebook {
    /// Create a new empty notebook
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

/// User-facing analysis object owning one notebook (1:1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Unique identifier (UUID)
    pub id: String,

    /// Owned notebook document (exactly one, deleted together)
    pub notebook_id: String,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl Analysis {
    /// Create a new analysis wrapping an existing notebook
    pub fn new(notebook_id: String, name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            notebook_id,
            name,
            description,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Sparse metadata update for an [`Analysis`].
///
/// `Some(None)` clears the description; chain state is never reachable
/// through this type.
#[derive(Debug, Clone, Default)]
pub struct AnalysisUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_wraps_notebook() {
        let notebook = Notebook::new();
        let analysis = Analysis::new(notebook.id.clone(), "Churn study".to_string(), None);
        assert_eq!(analysis.notebook_id, notebook.id);
        assert!(analysis.description.is_none());
    }
}
