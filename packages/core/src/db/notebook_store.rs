//! NotebookStore Trait - Storage Abstraction Layer
//!
//! This module defines the `NotebookStore` trait that abstracts persistence
//! of notebook records. The trait enables multiple backend implementations
//! (libsql, in-memory) without changing the chain algorithms in the
//! document layer.
//!
//! # Design
//!
//! - **Dumb repository**: the store persists and fetches individual
//!   records by id and by scope. It enforces no chain invariants; those
//!   belong exclusively to `document::NotebookDocument`.
//! - **Unordered listings**: `list_sections` / `list_results` return scope
//!   members in storage order. Callers order them by following the chain.
//! - **No cascade**: `delete_section` / `delete_result` remove a single
//!   row. Recursive teardown is the document layer's responsibility.
//! - **Async-first**: all methods are async to support both embedded
//!   (libsql) and purely in-memory backends behind one signature.
//! - **Error handling**: `anyhow::Result` for flexible context at the
//!   storage boundary; typed errors are produced by the layers above.
//!
//! # Examples
//!
//! ```rust
//! use labbook_core::db::{MemoryStore, NotebookStore};
//! use labbook_core::models::{Notebook, Section};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn NotebookStore> = Arc::new(MemoryStore::new());
//!
//!     let notebook = store.create_notebook(Notebook::new()).await?;
//!     let section = Section::new(notebook.id.clone(), None, "Intro".to_string(), None);
//!     store.create_section(section).await?;
//!     Ok(())
//! }
//! ```

use crate::models::{
    Analysis, AnalysisResult, AnalysisUpdate, Notebook, ResultUpdate, Section, SectionUpdate,
};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for notebook persistence operations.
///
/// Implementations must be `Send + Sync` so futures holding a store
/// reference can move between threads.
///
/// # Method Categories
///
/// - **Sections**: 5 methods (create, get, list by scope, update, delete)
/// - **Results**: 5 methods (create, get, list by section, update, delete)
/// - **Notebooks**: 3 methods (create, get, delete)
/// - **Analyses**: 5 methods (create, get, list, update, delete)
/// - **Lifecycle**: 1 method (close)
#[async_trait]
pub trait NotebookStore: Send + Sync {
    //
    // SECTION OPERATIONS
    //

    /// Persist a new section. Returns the stored record.
    async fn create_section(&self, section: Section) -> Result<Section>;

    /// Get a section by id (`Ok(None)` when absent, not an error)
    async fn get_section(&self, id: &str) -> Result<Option<Section>>;

    /// List all sections in one scope, unordered.
    ///
    /// `parent_section_id = None` selects the notebook's top-level scope.
    async fn list_sections(
        &self,
        notebook_id: &str,
        parent_section_id: Option<&str>,
    ) -> Result<Vec<Section>>;

    /// Apply a sparse update to a section. Returns the updated record.
    ///
    /// Errors if the section does not exist.
    async fn update_section(&self, id: &str, update: SectionUpdate) -> Result<Section>;

    /// Delete a single section row. No cascade, caller relinks first.
    async fn delete_section(&self, id: &str) -> Result<()>;

    //
    // RESULT OPERATIONS
    //

    /// Persist a new result (with its link sets and artifacts)
    async fn create_result(&self, result: AnalysisResult) -> Result<AnalysisResult>;

    /// Get a result by id (`Ok(None)` when absent, not an error)
    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>>;

    /// List all results directly in one section, unordered
    async fn list_results(&self, section_id: &str) -> Result<Vec<AnalysisResult>>;

    /// Apply a sparse update to a result. Returns the updated record.
    async fn update_result(&self, id: &str, update: ResultUpdate) -> Result<AnalysisResult>;

    /// Delete a single result row plus its artifact and association rows.
    ///
    /// Referenced datasets / data sources are never touched, only the
    /// association entries.
    async fn delete_result(&self, id: &str) -> Result<()>;

    //
    // NOTEBOOK OPERATIONS
    //

    /// Persist a new (empty) notebook
    async fn create_notebook(&self, notebook: Notebook) -> Result<Notebook>;

    /// Get a notebook by id
    async fn get_notebook(&self, id: &str) -> Result<Option<Notebook>>;

    /// Delete a notebook row. Callers tear down its sections first.
    async fn delete_notebook(&self, id: &str) -> Result<()>;

    //
    // ANALYSIS OPERATIONS
    //

    /// Persist a new analysis
    async fn create_analysis(&self, analysis: Analysis) -> Result<Analysis>;

    /// Get an analysis by id
    async fn get_analysis(&self, id: &str) -> Result<Option<Analysis>>;

    /// List all analyses, most recently modified first
    async fn list_analyses(&self) -> Result<Vec<Analysis>>;

    /// Apply a sparse metadata update to an analysis
    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> Result<Analysis>;

    /// Delete an analysis row
    async fn delete_analysis(&self, id: &str) -> Result<()>;

    //
    // LIFECYCLE
    //

    /// Flush pending writes and release resources
    async fn close(&self) -> Result<()>;
}
