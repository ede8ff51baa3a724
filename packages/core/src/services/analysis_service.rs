//! Analysis Service - User-Facing Analysis Lifecycle
//!
//! An analysis is the object users see and name; each one owns exactly one
//! notebook document. This service keeps the pair consistent: creating an
//! analysis creates its notebook, deleting one tears down the whole
//! document (sections, results, associations) before removing the
//! notebook and analysis records.
//!
//! It also answers the aggregate questions the document layer does not:
//! which datasets and data sources an analysis references anywhere in its
//! tree.

use crate::db::NotebookStore;
use crate::document::{NotebookDocument, SectionTree};
use crate::models::{Analysis, AnalysisUpdate, Notebook};
use crate::services::error::AnalysisServiceError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Lifecycle and aggregate queries for analyses.
pub struct AnalysisService {
    document: Arc<NotebookDocument>,
}

impl AnalysisService {
    pub fn new(document: Arc<NotebookDocument>) -> Self {
        Self { document }
    }

    /// The document layer for this service's store, for callers that need
    /// chain operations on an analysis's notebook
    pub fn document(&self) -> &Arc<NotebookDocument> {
        &self.document
    }

    fn store(&self) -> &Arc<dyn NotebookStore> {
        self.document.store()
    }

    async fn require_analysis(&self, id: &str) -> Result<Analysis, AnalysisServiceError> {
        self.store()
            .get_analysis(id)
            .await?
            .ok_or_else(|| AnalysisServiceError::analysis_not_found(id))
    }

    /// Create an analysis together with its (empty) notebook.
    ///
    /// The notebook is created first so the analysis never references a
    /// missing document.
    pub async fn create_analysis(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Analysis, AnalysisServiceError> {
        let notebook = self.store().create_notebook(Notebook::new()).await?;
        let analysis = Analysis::new(notebook.id.clone(), name, description);
        let created = self.store().create_analysis(analysis).await?;

        tracing::info!(
            analysis_id = %created.id,
            notebook_id = %notebook.id,
            "created analysis"
        );
        Ok(created)
    }

    /// Get an analysis by id
    pub async fn get_analysis(&self, id: &str) -> Result<Analysis, AnalysisServiceError> {
        self.require_analysis(id).await
    }

    /// List all analyses, most recently modified first
    pub async fn list_analyses(&self) -> Result<Vec<Analysis>, AnalysisServiceError> {
        Ok(self.store().list_analyses().await?)
    }

    /// Update an analysis's name and/or description
    pub async fn update_analysis(
        &self,
        id: &str,
        update: AnalysisUpdate,
    ) -> Result<Analysis, AnalysisServiceError> {
        self.require_analysis(id).await?;
        Ok(self.store().update_analysis(id, update).await?)
    }

    /// Delete an analysis and everything it owns.
    ///
    /// Teardown order: every top-level section (each cascades through its
    /// subtree), then the notebook, then the analysis record itself.
    pub async fn delete_analysis(&self, id: &str) -> Result<(), AnalysisServiceError> {
        let analysis = self.require_analysis(id).await?;

        let top_level = self
            .store()
            .list_sections(&analysis.notebook_id, None)
            .await?;
        for section in top_level {
            self.document.delete_section(&section.id).await?;
        }

        self.store().delete_notebook(&analysis.notebook_id).await?;
        self.store().delete_analysis(id).await?;

        tracing::info!(
            analysis_id = %id,
            notebook_id = %analysis.notebook_id,
            "deleted analysis and its notebook"
        );
        Ok(())
    }

    /// Materialize the analysis's notebook as ordered section trees
    pub async fn tree(&self, id: &str) -> Result<Vec<SectionTree>, AnalysisServiceError> {
        let analysis = self.require_analysis(id).await?;
        Ok(self.document.notebook_tree(&analysis.notebook_id).await?)
    }

    /// All dataset ids referenced by any result in the analysis, sorted
    /// and deduplicated
    pub async fn linked_dataset_ids(&self, id: &str) -> Result<Vec<String>, AnalysisServiceError> {
        self.collect_links(id, |r| &r.dataset_ids).await
    }

    /// All data-source ids referenced by any result in the analysis,
    /// sorted and deduplicated
    pub async fn linked_data_source_ids(
        &self,
        id: &str,
    ) -> Result<Vec<String>, AnalysisServiceError> {
        self.collect_links(id, |r| &r.data_source_ids).await
    }

    async fn collect_links(
        &self,
        id: &str,
        pick: fn(&crate::models::AnalysisResult) -> &Vec<String>,
    ) -> Result<Vec<String>, AnalysisServiceError> {
        let trees = self.tree(id).await?;
        let mut ids: BTreeSet<String> = BTreeSet::new();
        for tree in &trees {
            collect_from_tree(tree, pick, &mut ids);
        }
        Ok(ids.into_iter().collect())
    }
}

fn collect_from_tree(
    tree: &SectionTree,
    pick: fn(&crate::models::AnalysisResult) -> &Vec<String>,
    ids: &mut BTreeSet<String>,
) {
    for result in &tree.results {
        for linked in pick(result) {
            ids.insert(linked.clone());
        }
    }
    for child in &tree.children {
        collect_from_tree(child, pick, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::document::CreateResultParams;

    fn service() -> (Arc<MemoryStore>, AnalysisService) {
        let store = Arc::new(MemoryStore::new());
        let document = Arc::new(NotebookDocument::new(store.clone()));
        (store, AnalysisService::new(document))
    }

    #[tokio::test]
    async fn test_create_analysis_creates_notebook() {
        let (store, service) = service();
        let analysis = service
            .create_analysis("Churn".to_string(), None)
            .await
            .unwrap();

        let notebook = store.get_notebook(&analysis.notebook_id).await.unwrap();
        assert!(notebook.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_analysis_is_not_found() {
        let (_store, service) = service();
        let err = service.get_analysis("ghost").await.unwrap_err();
        assert!(matches!(err, AnalysisServiceError::AnalysisNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_analysis_metadata() {
        let (_store, service) = service();
        let analysis = service
            .create_analysis("Churn".to_string(), Some("v1".to_string()))
            .await
            .unwrap();

        let updated = service
            .update_analysis(
                &analysis.id,
                AnalysisUpdate {
                    name: Some("Churn v2".to_string()),
                    description: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Churn v2");
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn test_delete_analysis_tears_down_document() {
        let (store, service) = service();
        let analysis = service
            .create_analysis("Churn".to_string(), None)
            .await
            .unwrap();

        let doc = service.document().clone();
        let section = doc
            .append_section(&analysis.notebook_id, None, "EDA".to_string(), None)
            .await
            .unwrap();
        let result = doc
            .append_result(&section.id, CreateResultParams::default())
            .await
            .unwrap();

        service.delete_analysis(&analysis.id).await.unwrap();

        assert!(store.get_analysis(&analysis.id).await.unwrap().is_none());
        assert!(store
            .get_notebook(&analysis.notebook_id)
            .await
            .unwrap()
            .is_none());
        assert!(store.get_section(&section.id).await.unwrap().is_none());
        assert!(store.get_result(&result.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_linked_ids_union_across_tree() {
        let (_store, service) = service();
        let analysis = service
            .create_analysis("Churn".to_string(), None)
            .await
            .unwrap();

        let doc = service.document().clone();
        let top = doc
            .append_section(&analysis.notebook_id, None, "Top".to_string(), None)
            .await
            .unwrap();
        let nested = doc
            .append_section(&analysis.notebook_id, Some(&top.id), "Nested".to_string(), None)
            .await
            .unwrap();

        doc.append_result(
            &top.id,
            CreateResultParams {
                analysis: "a".to_string(),
                dataset_ids: vec!["ds-2".to_string(), "ds-1".to_string()],
                data_source_ids: vec!["src-1".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        doc.append_result(
            &nested.id,
            CreateResultParams {
                analysis: "b".to_string(),
                dataset_ids: vec!["ds-1".to_string(), "ds-3".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let datasets = service.linked_dataset_ids(&analysis.id).await.unwrap();
        assert_eq!(datasets, vec!["ds-1", "ds-2", "ds-3"]);

        let sources = service.linked_data_source_ids(&analysis.id).await.unwrap();
        assert_eq!(sources, vec!["src-1"]);
    }
}
