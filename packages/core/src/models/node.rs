//! Notebook Node Data Structures
//!
//! This module defines the two node kinds that make up a notebook document:
//! [`Section`] (a named, describable grouping node) and [`AnalysisResult`]
//! (a leaf cell holding analysis text, optional code, and artifact payloads).
//!
//! # Ordering model
//!
//! Nodes in the same scope form a singly linked chain through their `next`
//! field. The successor of a node may be either a section or a result, so
//! the two kinds interleave freely within one chain. [`NodeRef`] is the
//! tagged successor union; there is no stringly-typed `next_type` anywhere
//! in the public API.
//!
//! # Examples
//!
//! ```rust
//! use labbook_core::models::{AnalysisResult, NodeRef, Section};
//!
//! let intro = Section::new("nb-1".to_string(), None, "Intro".to_string(), None);
//! let mut summary = AnalysisResult::new(intro.id.clone(), "Summary stats".to_string());
//! summary.next = Some(NodeRef::Section("some-section-id".to_string()));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tagged reference to a chain successor.
///
/// A scope chain may interleave sections and results, so a `next` pointer
/// must carry the kind of the node it targets. Persisted relationally as a
/// (`next_type`, `next_id`) column pair; in memory it is always this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    /// Reference to a [`Section`] by id
    Section(String),
    /// Reference to an [`AnalysisResult`] by id
    Result(String),
}

impl NodeRef {
    /// The id of the referenced node, regardless of kind
    pub fn id(&self) -> &str {
        match self {
            NodeRef::Section(id) | NodeRef::Result(id) => id,
        }
    }

    /// Kind tag as stored in the `next_type` column
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Section(_) => "section",
            NodeRef::Result(_) => "result",
        }
    }

    /// Rebuild a reference from the persisted (`next_type`, `next_id`) pair.
    ///
    /// Returns `None` when both columns are NULL. An unknown tag or a
    /// half-null pair is a data error and is surfaced rather than silently
    /// dropped.
    pub fn from_columns(
        next_type: Option<String>,
        next_id: Option<String>,
    ) -> anyhow::Result<Option<NodeRef>> {
        match (next_type, next_id) {
            (Some(kind), Some(id)) => match kind.as_str() {
                "section" => Ok(Some(NodeRef::Section(id))),
                "result" => Ok(Some(NodeRef::Result(id))),
                other => Err(anyhow::anyhow!("Unknown next_type tag '{}'", other)),
            },
            (None, None) => Ok(None),
            (kind, id) => Err(anyhow::anyhow!(
                "Half-null successor pair: next_type={:?}, next_id={:?}",
                kind,
                id
            )),
        }
    }

    /// Split a reference into the persisted column pair
    pub fn to_columns(next: &Option<NodeRef>) -> (Option<&'static str>, Option<&str>) {
        match next {
            Some(r) => (Some(r.kind()), Some(r.id())),
            None => (None, None),
        }
    }
}

/// Kind of a rendering artifact attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Plot,
    Table,
}

impl ArtifactKind {
    /// Human-readable label for report output
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Plot => "Plot",
            ArtifactKind::Table => "Table",
        }
    }
}

/// Opaque rendering artifact attached to an [`AnalysisResult`].
///
/// The document layer never interprets `spec`; it is handed verbatim to an
/// external renderer when a report is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact identifier
    pub id: String,

    /// Plot or table
    pub kind: ArtifactKind,

    /// Renderer-specific payload (chart spec, table data, ...)
    pub spec: serde_json::Value,
}

impl Artifact {
    /// Create a new artifact with an auto-generated UUID
    pub fn new(kind: ArtifactKind, spec: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            spec,
        }
    }
}

/// A named, describable grouping node.
///
/// Sections nest recursively: a section with `parent_section_id = None` is a
/// top-level section of its notebook, otherwise it lives in its parent's
/// scope. The section's own scope contains its direct child sections and
/// the results placed directly in it, interleaved in one chain.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID)
/// - `notebook_id`: Owning notebook document
/// - `parent_section_id`: Parent section, or `None` for top-level
/// - `name` / `description`: Presentation metadata
/// - `next`: Chain successor within this node's scope
/// - `created_at` / `modified_at`: Timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique identifier (UUID)
    pub id: String,

    /// Owning notebook document
    pub notebook_id: String,

    /// Parent section (None = top-level scope of the notebook)
    pub parent_section_id: Option<String>,

    /// Section heading
    pub name: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Chain successor within this node's scope
    pub next: Option<NodeRef>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl Section {
    /// Create a new section with an auto-generated UUID and no successor.
    ///
    /// New sections are always appended at the tail of their target scope,
    /// so `next` starts out as `None`.
    pub fn new(
        notebook_id: String,
        parent_section_id: Option<String>,
        name: String,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            notebook_id,
            parent_section_id,
            name,
            description,
            next: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Typed reference to this section
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::Section(self.id.clone())
    }
}

/// Sparse update for a [`Section`].
///
/// `None` leaves a field untouched. Clearable fields use `Option<Option<_>>`:
/// `Some(None)` writes NULL, `Some(Some(v))` writes `v`.
///
/// Chain-affecting fields (`parent_section_id`, `next`) must only be written
/// by the document layer; all other callers restrict themselves to `name`
/// and `description`.
#[derive(Debug, Clone, Default)]
pub struct SectionUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_section_id: Option<Option<String>>,
    pub next: Option<Option<NodeRef>>,
}

/// A notebook cell: free-form analysis text, optional code, link sets, and
/// attached artifacts.
///
/// Results never float outside a section: `section_id` is always set, and
/// changes only through an explicit move, which atomically rewrites both
/// scope and chain position.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID)
/// - `section_id`: Owning section (never `None`)
/// - `next`: Chain successor within the owning section's scope
/// - `analysis`: Free-form analysis text
/// - `python_code`: Optional code that produced the result
/// - `dataset_ids` / `data_source_ids`: Non-owning many-to-many link sets,
///   resolved by external registries and never validated here
/// - `artifacts`: Opaque rendering payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unique identifier (UUID)
    pub id: String,

    /// Owning section (results never float outside a section)
    pub section_id: String,

    /// Chain successor within the owning section's scope
    pub next: Option<NodeRef>,

    /// Free-form analysis text
    pub analysis: String,

    /// Optional code that produced the result
    pub python_code: Option<String>,

    /// Referenced dataset ids (non-owning association)
    #[serde(default)]
    pub dataset_ids: Vec<String>,

    /// Referenced data-source ids (non-owning association)
    #[serde(default)]
    pub data_source_ids: Vec<String>,

    /// Attached rendering artifacts (opaque payloads)
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Create a new result with an auto-generated UUID and no successor
    pub fn new(section_id: String, analysis: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            section_id,
            next: None,
            analysis,
            python_code: None,
            dataset_ids: Vec::new(),
            data_source_ids: Vec::new(),
            artifacts: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Typed reference to this result
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::Result(self.id.clone())
    }
}

/// Sparse update for an [`AnalysisResult`].
///
/// Same conventions as [`SectionUpdate`]; `section_id` and `next` are
/// chain-affecting and reserved for the document layer.
#[derive(Debug, Clone, Default)]
pub struct ResultUpdate {
    pub analysis: Option<String>,
    pub python_code: Option<Option<String>>,
    pub dataset_ids: Option<Vec<String>>,
    pub data_source_ids: Option<Vec<String>>,
    pub artifacts: Option<Vec<Artifact>>,
    pub section_id: Option<String>,
    pub next: Option<Option<NodeRef>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_ref_column_round_trip() {
        let next = Some(NodeRef::Result("r-1".to_string()));
        let (kind, id) = NodeRef::to_columns(&next);
        assert_eq!(kind, Some("result"));
        assert_eq!(id, Some("r-1"));

        let rebuilt = NodeRef::from_columns(kind.map(String::from), id.map(String::from)).unwrap();
        assert_eq!(rebuilt, next);

        assert_eq!(NodeRef::from_columns(None, None).unwrap(), None);
    }

    #[test]
    fn test_node_ref_rejects_unknown_tag() {
        let err = NodeRef::from_columns(Some("pipeline".to_string()), Some("x".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_node_ref_rejects_half_null_pair() {
        assert!(NodeRef::from_columns(Some("section".to_string()), None).is_err());
        assert!(NodeRef::from_columns(None, Some("s-1".to_string())).is_err());
    }

    #[test]
    fn test_new_section_is_tail() {
        let section = Section::new("nb-1".to_string(), None, "Intro".to_string(), None);
        assert!(section.next.is_none());
        assert_eq!(section.node_ref(), NodeRef::Section(section.id.clone()));
    }

    #[test]
    fn test_new_result_belongs_to_section() {
        let result = AnalysisResult::new("s-1".to_string(), "Summary".to_string());
        assert_eq!(result.section_id, "s-1");
        assert!(result.next.is_none());
        assert!(result.dataset_ids.is_empty());
    }

    #[test]
    fn test_artifact_serialization() {
        let artifact = Artifact::new(ArtifactKind::Plot, json!({"chart": "bar"}));
        let text = serde_json::to_string(&artifact).unwrap();
        let back: Artifact = serde_json::from_str(&text).unwrap();
        assert_eq!(back, artifact);
    }
}
