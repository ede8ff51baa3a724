//! Analysis Service and Report Integration Tests
//!
//! Runs the full stack over the libsql backend: analysis lifecycle
//! (create with notebook, metadata updates, cascading delete), linked-id
//! aggregation across the tree, and Markdown report rendering including
//! artifact failure handling.

#[cfg(test)]
mod analysis_report_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use labbook_core::db::{DatabaseService, NotebookStore, TursoStore};
    use labbook_core::document::{CreateResultParams, NotebookDocument};
    use labbook_core::models::{AnalysisUpdate, Artifact, ArtifactKind};
    use labbook_core::report::{
        ArtifactRenderError, ArtifactRenderer, JsonArtifactRenderer, ReportOptions, ReportRenderer,
    };
    use labbook_core::services::{AnalysisService, AnalysisServiceError};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_service() -> Result<(AnalysisService, Arc<NotebookDocument>, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("labbook-test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        let store: Arc<dyn NotebookStore> = Arc::new(TursoStore::new(db));
        let document = Arc::new(NotebookDocument::new(store));
        Ok((AnalysisService::new(document.clone()), document, temp_dir))
    }

    #[tokio::test]
    async fn test_analysis_lifecycle() -> Result<()> {
        let (service, _doc, _dir) = create_service().await?;

        let analysis = service
            .create_analysis("Churn study".to_string(), Some("Q3".to_string()))
            .await?;
        assert!(!analysis.notebook_id.is_empty());

        let fetched = service.get_analysis(&analysis.id).await?;
        assert_eq!(fetched.name, "Churn study");

        let updated = service
            .update_analysis(
                &analysis.id,
                AnalysisUpdate {
                    name: Some("Churn study v2".to_string()),
                    description: Some(None),
                },
            )
            .await?;
        assert_eq!(updated.name, "Churn study v2");
        assert_eq!(updated.description, None);

        let listed = service.list_analyses().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, analysis.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_analysis_cascades_through_document() -> Result<()> {
        let (service, doc, _dir) = create_service().await?;

        let analysis = service.create_analysis("Churn".to_string(), None).await?;
        let section = doc
            .append_section(&analysis.notebook_id, None, "EDA".to_string(), None)
            .await?;
        let nested = doc
            .append_section(
                &analysis.notebook_id,
                Some(&section.id),
                "Detail".to_string(),
                None,
            )
            .await?;
        let result = doc
            .append_result(&nested.id, CreateResultParams::default())
            .await?;

        service.delete_analysis(&analysis.id).await?;

        let err = service.get_analysis(&analysis.id).await.unwrap_err();
        assert!(matches!(err, AnalysisServiceError::AnalysisNotFound { .. }));
        assert!(doc.store().get_notebook(&analysis.notebook_id).await?.is_none());
        assert!(doc.store().get_section(&section.id).await?.is_none());
        assert!(doc.store().get_section(&nested.id).await?.is_none());
        assert!(doc.store().get_result(&result.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_linked_ids_deduplicate_across_sections() -> Result<()> {
        let (service, doc, _dir) = create_service().await?;

        let analysis = service.create_analysis("Links".to_string(), None).await?;
        let s1 = doc
            .append_section(&analysis.notebook_id, None, "S1".to_string(), None)
            .await?;
        let s2 = doc
            .append_section(&analysis.notebook_id, None, "S2".to_string(), None)
            .await?;

        doc.append_result(
            &s1.id,
            CreateResultParams {
                analysis: "first".to_string(),
                dataset_ids: vec!["ds-b".to_string(), "ds-a".to_string()],
                data_source_ids: vec!["src-1".to_string()],
                ..Default::default()
            },
        )
        .await?;
        doc.append_result(
            &s2.id,
            CreateResultParams {
                analysis: "second".to_string(),
                dataset_ids: vec!["ds-a".to_string(), "ds-c".to_string()],
                data_source_ids: vec!["src-1".to_string()],
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(
            service.linked_dataset_ids(&analysis.id).await?,
            vec!["ds-a", "ds-b", "ds-c"]
        );
        assert_eq!(
            service.linked_data_source_ids(&analysis.id).await?,
            vec!["src-1"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_report_renders_full_analysis() -> Result<()> {
        let (service, doc, _dir) = create_service().await?;

        let analysis = service
            .create_analysis(
                "Quarterly churn".to_string(),
                Some("Drivers of Q3 churn".to_string()),
            )
            .await?;
        let intro = doc
            .append_section(
                &analysis.notebook_id,
                None,
                "Intro".to_string(),
                Some("Data and scope".to_string()),
            )
            .await?;
        doc.append_result(
            &intro.id,
            CreateResultParams {
                analysis: "Churn peaked in July.".to_string(),
                python_code: Some("df.resample('M').churn.mean()".to_string()),
                artifacts: vec![Artifact::new(ArtifactKind::Table, json!({"rows": 3}))],
                ..Default::default()
            },
        )
        .await?;

        let renderer = ReportRenderer::new(doc.clone(), Arc::new(JsonArtifactRenderer));
        let report = renderer.render(&analysis, &ReportOptions::default()).await?;

        assert!(report.starts_with("# Quarterly churn\n"));
        assert!(report.contains("Drivers of Q3 churn"));
        assert!(report.contains("## Intro"));
        assert!(report.contains("Data and scope"));
        assert!(report.contains("Churn peaked in July."));
        assert!(report.contains("```python"));
        assert!(report.contains("```json"));
        Ok(())
    }

    struct BrokenRenderer;

    #[async_trait]
    impl ArtifactRenderer for BrokenRenderer {
        async fn render(&self, _artifact: &Artifact) -> Result<String, ArtifactRenderError> {
            Err(ArtifactRenderError::unsupported("hologram"))
        }
    }

    #[tokio::test]
    async fn test_report_survives_renderer_failure() -> Result<()> {
        let (service, doc, _dir) = create_service().await?;

        let analysis = service.create_analysis("Charts".to_string(), None).await?;
        let section = doc
            .append_section(&analysis.notebook_id, None, "Plots".to_string(), None)
            .await?;
        doc.append_result(
            &section.id,
            CreateResultParams {
                analysis: "See chart.".to_string(),
                artifacts: vec![Artifact::new(ArtifactKind::Plot, json!({"mark": "line"}))],
                ..Default::default()
            },
        )
        .await?;

        let renderer = ReportRenderer::new(doc.clone(), Arc::new(BrokenRenderer));
        let report = renderer.render(&analysis, &ReportOptions::default()).await?;

        assert!(report.contains("See chart."));
        assert!(report.contains("could not be rendered"));
        assert!(report.contains("hologram"));
        Ok(())
    }
}
