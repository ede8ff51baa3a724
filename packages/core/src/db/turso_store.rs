//! TursoStore - NotebookStore Implementation for the libsql Backend
//!
//! Thin wrapper around [`DatabaseService`] that implements the
//! [`NotebookStore`] trait. All SQL lives in `DatabaseService`; this module
//! handles `libsql::Row` to model conversion and the merge step for sparse
//! updates (read the current row, overlay the changed fields, write the
//! full row back).
//!
//! # Examples
//!
//! ```rust,no_run
//! use labbook_core::db::{DatabaseService, NotebookStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/labbook.db")).await?);
//!     let store: Arc<dyn NotebookStore> = Arc::new(TursoStore::new(db));
//!     let section = store.get_section("section-123").await?;
//!     Ok(())
//! }
//! ```

use crate::db::database::{DatabaseService, DbResultParams, DbSectionParams};
use crate::db::notebook_store::NotebookStore;
use crate::models::{
    Analysis, AnalysisResult, AnalysisUpdate, Artifact, Notebook, NodeRef, ResultUpdate, Section,
    SectionUpdate,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::Row;
use std::sync::Arc;

/// libsql-backed notebook store
pub struct TursoStore {
    /// Underlying database service (owns the SQL)
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapping the given DatabaseService
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Parse timestamps in either SQLite (`YYYY-MM-DD HH:MM:SS`) or
    /// RFC3339 format
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        ))
    }

    /// Convert a sections row to a [`Section`].
    ///
    /// Expected columns (in order): id, notebook_id, parent_section_id,
    /// name, description, next_type, next_id, created_at, modified_at.
    fn row_to_section(row: &Row) -> Result<Section> {
        let id: String = row.get(0).context("Failed to get id")?;
        let notebook_id: String = row.get(1).context("Failed to get notebook_id")?;
        let parent_section_id: Option<String> =
            row.get(2).context("Failed to get parent_section_id")?;
        let name: String = row.get(3).context("Failed to get name")?;
        let description: Option<String> = row.get(4).context("Failed to get description")?;
        let next_type: Option<String> = row.get(5).context("Failed to get next_type")?;
        let next_id: Option<String> = row.get(6).context("Failed to get next_id")?;
        let created_at_str: String = row.get(7).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(8).context("Failed to get modified_at")?;

        Ok(Section {
            id,
            notebook_id,
            parent_section_id,
            name,
            description,
            next: NodeRef::from_columns(next_type, next_id)?,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse created_at")?,
            modified_at: Self::parse_timestamp(&modified_at_str)
                .context("Failed to parse modified_at")?,
        })
    }

    /// Convert a results row to an [`AnalysisResult`], fetching its link
    /// sets from the association tables.
    ///
    /// Expected columns (in order): id, section_id, analysis, python_code,
    /// artifacts, next_type, next_id, created_at, modified_at.
    async fn row_to_result(&self, row: &Row) -> Result<AnalysisResult> {
        let id: String = row.get(0).context("Failed to get id")?;
        let section_id: String = row.get(1).context("Failed to get section_id")?;
        let analysis: String = row.get(2).context("Failed to get analysis")?;
        let python_code: Option<String> = row.get(3).context("Failed to get python_code")?;
        let artifacts_json: String = row.get(4).context("Failed to get artifacts")?;
        let next_type: Option<String> = row.get(5).context("Failed to get next_type")?;
        let next_id: Option<String> = row.get(6).context("Failed to get next_id")?;
        let created_at_str: String = row.get(7).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(8).context("Failed to get modified_at")?;

        let artifacts: Vec<Artifact> =
            serde_json::from_str(&artifacts_json).context("Failed to parse artifacts JSON")?;

        let dataset_ids = self.db.db_get_result_datasets(&id).await?;
        let data_source_ids = self.db.db_get_result_data_sources(&id).await?;

        Ok(AnalysisResult {
            id,
            section_id,
            next: NodeRef::from_columns(next_type, next_id)?,
            analysis,
            python_code,
            dataset_ids,
            data_source_ids,
            artifacts,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse created_at")?,
            modified_at: Self::parse_timestamp(&modified_at_str)
                .context("Failed to parse modified_at")?,
        })
    }

    /// Convert an analyses row to an [`Analysis`]
    fn row_to_analysis(row: &Row) -> Result<Analysis> {
        let id: String = row.get(0).context("Failed to get id")?;
        let notebook_id: String = row.get(1).context("Failed to get notebook_id")?;
        let name: String = row.get(2).context("Failed to get name")?;
        let description: Option<String> = row.get(3).context("Failed to get description")?;
        let created_at_str: String = row.get(4).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(5).context("Failed to get modified_at")?;

        Ok(Analysis {
            id,
            notebook_id,
            name,
            description,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse created_at")?,
            modified_at: Self::parse_timestamp(&modified_at_str)
                .context("Failed to parse modified_at")?,
        })
    }
}

#[async_trait]
impl NotebookStore for TursoStore {
    async fn create_section(&self, section: Section) -> Result<Section> {
        let (next_type, next_id) = NodeRef::to_columns(&section.next);

        self.db
            .db_create_section(DbSectionParams {
                id: &section.id,
                notebook_id: &section.notebook_id,
                parent_section_id: section.parent_section_id.as_deref(),
                name: &section.name,
                description: section.description.as_deref(),
                next_type,
                next_id,
            })
            .await
            .context("Failed to create section")?;

        self.get_section(&section.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Section not found after creation"))
    }

    async fn get_section(&self, id: &str) -> Result<Option<Section>> {
        match self.db.db_get_section(id).await.context("Failed to get section")? {
            Some(row) => Ok(Some(Self::row_to_section(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_sections(
        &self,
        notebook_id: &str,
        parent_section_id: Option<&str>,
    ) -> Result<Vec<Section>> {
        let rows = self
            .db
            .db_list_sections(notebook_id, parent_section_id)
            .await
            .context("Failed to list sections")?;

        rows.iter().map(Self::row_to_section).collect()
    }

    async fn update_section(&self, id: &str, update: SectionUpdate) -> Result<Section> {
        let current = self
            .get_section(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Section not found: {}", id))?;

        // Merge sparse update into the current record, then write all
        // columns back in one statement.
        let merged = Section {
            id: current.id.clone(),
            notebook_id: current.notebook_id,
            parent_section_id: match update.parent_section_id {
                None => current.parent_section_id,
                Some(new_parent) => new_parent,
            },
            name: update.name.unwrap_or(current.name),
            description: match update.description {
                None => current.description,
                Some(new_description) => new_description,
            },
            next: match update.next {
                None => current.next,
                Some(new_next) => new_next,
            },
            created_at: current.created_at,
            modified_at: Utc::now(),
        };

        let (next_type, next_id) = NodeRef::to_columns(&merged.next);

        self.db
            .db_update_section(DbSectionParams {
                id,
                notebook_id: &merged.notebook_id,
                parent_section_id: merged.parent_section_id.as_deref(),
                name: &merged.name,
                description: merged.description.as_deref(),
                next_type,
                next_id,
            })
            .await
            .context("Failed to update section")?;

        self.get_section(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Section not found after update"))
    }

    async fn delete_section(&self, id: &str) -> Result<()> {
        self.db
            .db_delete_section(id)
            .await
            .context("Failed to delete section")?;
        Ok(())
    }

    async fn create_result(&self, result: AnalysisResult) -> Result<AnalysisResult> {
        let artifacts_json =
            serde_json::to_string(&result.artifacts).context("Failed to serialize artifacts")?;
        let (next_type, next_id) = NodeRef::to_columns(&result.next);

        self.db
            .db_create_result(DbResultParams {
                id: &result.id,
                section_id: &result.section_id,
                analysis: &result.analysis,
                python_code: result.python_code.as_deref(),
                artifacts: &artifacts_json,
                next_type,
                next_id,
            })
            .await
            .context("Failed to create result")?;

        self.db
            .db_set_result_datasets(&result.id, &result.dataset_ids)
            .await?;
        self.db
            .db_set_result_data_sources(&result.id, &result.data_source_ids)
            .await?;

        self.get_result(&result.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Result not found after creation"))
    }

    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>> {
        match self.db.db_get_result(id).await.context("Failed to get result")? {
            Some(row) => Ok(Some(self.row_to_result(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_results(&self, section_id: &str) -> Result<Vec<AnalysisResult>> {
        let rows = self
            .db
            .db_list_results(section_id)
            .await
            .context("Failed to list results")?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            results.push(self.row_to_result(row).await?);
        }
        Ok(results)
    }

    async fn update_result(&self, id: &str, update: ResultUpdate) -> Result<AnalysisResult> {
        let current = self
            .get_result(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Result not found: {}", id))?;

        let merged = AnalysisResult {
            id: current.id.clone(),
            section_id: update.section_id.unwrap_or(current.section_id),
            next: match update.next {
                None => current.next,
                Some(new_next) => new_next,
            },
            analysis: update.analysis.unwrap_or(current.analysis),
            python_code: match update.python_code {
                None => current.python_code,
                Some(new_code) => new_code,
            },
            dataset_ids: update.dataset_ids.unwrap_or(current.dataset_ids),
            data_source_ids: update.data_source_ids.unwrap_or(current.data_source_ids),
            artifacts: update.artifacts.unwrap_or(current.artifacts),
            created_at: current.created_at,
            modified_at: Utc::now(),
        };

        let artifacts_json =
            serde_json::to_string(&merged.artifacts).context("Failed to serialize artifacts")?;
        let (next_type, next_id) = NodeRef::to_columns(&merged.next);

        self.db
            .db_update_result(DbResultParams {
                id,
                section_id: &merged.section_id,
                analysis: &merged.analysis,
                python_code: merged.python_code.as_deref(),
                artifacts: &artifacts_json,
                next_type,
                next_id,
            })
            .await
            .context("Failed to update result")?;

        self.db
            .db_set_result_datasets(id, &merged.dataset_ids)
            .await?;
        self.db
            .db_set_result_data_sources(id, &merged.data_source_ids)
            .await?;

        self.get_result(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Result not found after update"))
    }

    async fn delete_result(&self, id: &str) -> Result<()> {
        self.db
            .db_delete_result(id)
            .await
            .context("Failed to delete result")?;
        Ok(())
    }

    async fn create_notebook(&self, notebook: Notebook) -> Result<Notebook> {
        self.db
            .db_create_notebook(&notebook.id)
            .await
            .context("Failed to create notebook")?;

        self.get_notebook(&notebook.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Notebook not found after creation"))
    }

    async fn get_notebook(&self, id: &str) -> Result<Option<Notebook>> {
        match self
            .db
            .db_get_notebook(id)
            .await
            .context("Failed to get notebook")?
        {
            Some(row) => {
                let id: String = row.get(0).context("Failed to get id")?;
                let created_at_str: String = row.get(1).context("Failed to get created_at")?;
                Ok(Some(Notebook {
                    id,
                    created_at: Self::parse_timestamp(&created_at_str)
                        .context("Failed to parse created_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn delete_notebook(&self, id: &str) -> Result<()> {
        self.db
            .db_delete_notebook(id)
            .await
            .context("Failed to delete notebook")?;
        Ok(())
    }

    async fn create_analysis(&self, analysis: Analysis) -> Result<Analysis> {
        self.db
            .db_create_analysis(
                &analysis.id,
                &analysis.notebook_id,
                &analysis.name,
                analysis.description.as_deref(),
            )
            .await
            .context("Failed to create analysis")?;

        self.get_analysis(&analysis.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Analysis not found after creation"))
    }

    async fn get_analysis(&self, id: &str) -> Result<Option<Analysis>> {
        match self
            .db
            .db_get_analysis(id)
            .await
            .context("Failed to get analysis")?
        {
            Some(row) => Ok(Some(Self::row_to_analysis(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_analyses(&self) -> Result<Vec<Analysis>> {
        let rows = self
            .db
            .db_list_analyses()
            .await
            .context("Failed to list analyses")?;

        rows.iter().map(Self::row_to_analysis).collect()
    }

    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> Result<Analysis> {
        let current = self
            .get_analysis(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Analysis not found: {}", id))?;

        let name = update.name.unwrap_or(current.name);
        let description = match update.description {
            None => current.description,
            Some(new_description) => new_description,
        };

        self.db
            .db_update_analysis(id, &name, description.as_deref())
            .await
            .context("Failed to update analysis")?;

        self.get_analysis(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Analysis not found after update"))
    }

    async fn delete_analysis(&self, id: &str) -> Result<()> {
        self.db
            .db_delete_analysis(id)
            .await
            .context("Failed to delete analysis")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // libsql flushes on drop; nothing to do beyond letting the Arc go.
        Ok(())
    }
}
