//! Markdown Report Rendering
//!
//! Turns an analysis into a self-contained Markdown document: section
//! headings scale with nesting depth, result analysis text becomes body
//! paragraphs, code is optionally included as fenced blocks, and artifacts
//! are delegated to an [`ArtifactRenderer`].
//!
//! A failing artifact never fails the report. The error is logged and an
//! inline placeholder marks the spot, so a report with one broken chart
//! still ships the other ninety-nine.

use crate::document::{DocumentError, NotebookDocument, SectionTree};
use crate::models::{Analysis, AnalysisResult, Artifact};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an [`ArtifactRenderer`] for a single artifact
#[derive(Error, Debug)]
pub enum ArtifactRenderError {
    /// The renderer does not handle this artifact kind
    #[error("unsupported artifact kind '{kind}'")]
    Unsupported { kind: String },

    /// The renderer accepted the artifact but failed to produce output
    #[error("rendering failed: {message}")]
    Failed { message: String },
}

impl ArtifactRenderError {
    /// Create an Unsupported error
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::Unsupported { kind: kind.into() }
    }

    /// Create a Failed error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Renders one artifact into a Markdown fragment.
///
/// Implementations own the interpretation of [`Artifact::spec`]; the
/// report renderer treats the payload as opaque.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, artifact: &Artifact) -> Result<String, ArtifactRenderError>;
}

/// Default artifact renderer: emits the artifact's spec as a fenced JSON
/// block with a kind caption. Useful for debugging and as a fallback when
/// no chart backend is wired up.
pub struct JsonArtifactRenderer;

#[async_trait]
impl ArtifactRenderer for JsonArtifactRenderer {
    async fn render(&self, artifact: &Artifact) -> Result<String, ArtifactRenderError> {
        let body = serde_json::to_string_pretty(&artifact.spec)
            .map_err(|e| ArtifactRenderError::failed(e.to_string()))?;
        Ok(format!(
            "*{} `{}`*\n\n```json\n{}\n```",
            artifact.kind.label(),
            artifact.id,
            body
        ))
    }
}

/// Rendering knobs
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Include each result's code as a fenced block
    pub include_code: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { include_code: true }
    }
}

/// Renders a whole analysis to Markdown, walking the materialized tree in
/// chain order.
pub struct ReportRenderer {
    document: Arc<NotebookDocument>,
    artifacts: Arc<dyn ArtifactRenderer>,
}

impl ReportRenderer {
    pub fn new(document: Arc<NotebookDocument>, artifacts: Arc<dyn ArtifactRenderer>) -> Self {
        Self {
            document,
            artifacts,
        }
    }

    /// Render the full report for an analysis.
    ///
    /// The document title comes from the analysis name; top-level sections
    /// start at heading level 2 and each nesting level goes one deeper,
    /// capped at Markdown's six.
    pub async fn render(
        &self,
        analysis: &Analysis,
        options: &ReportOptions,
    ) -> Result<String, DocumentError> {
        let trees = self.document.notebook_tree(&analysis.notebook_id).await?;

        let mut out = String::new();
        let _ = writeln!(out, "# {}", analysis.name.trim());
        if let Some(description) = &analysis.description {
            let _ = writeln!(out, "\n{}", description.trim());
        }

        for tree in &trees {
            self.render_section(&mut out, tree, 2, options).await;
        }

        tracing::debug!(
            analysis_id = %analysis.id,
            sections = trees.len(),
            "rendered report"
        );
        Ok(out)
    }

    fn render_section<'a>(
        &'a self,
        out: &'a mut String,
        tree: &'a SectionTree,
        depth: usize,
        options: &'a ReportOptions,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let level = depth.min(6);
            let _ = writeln!(out, "\n{} {}", "#".repeat(level), tree.section.name.trim());
            if let Some(description) = &tree.section.description {
                let _ = writeln!(out, "\n{}", description.trim());
            }

            for result in &tree.results {
                self.render_result(out, result, options).await;
            }

            for child in &tree.children {
                self.render_section(out, child, depth + 1, options).await;
            }
        })
    }

    async fn render_result(
        &self,
        out: &mut String,
        result: &AnalysisResult,
        options: &ReportOptions,
    ) {
        if !result.analysis.trim().is_empty() {
            let _ = writeln!(out, "\n{}", result.analysis.trim());
        }

        if options.include_code {
            if let Some(code) = &result.python_code {
                let _ = writeln!(out, "\n```python\n{}\n```", code.trim_end());
            }
        }

        for artifact in &result.artifacts {
            match self.artifacts.render(artifact).await {
                Ok(fragment) => {
                    let _ = writeln!(out, "\n{}", fragment.trim_end());
                }
                Err(e) => {
                    tracing::warn!(
                        artifact_id = %artifact.id,
                        result_id = %result.id,
                        error = %e,
                        "artifact failed to render, emitting placeholder"
                    );
                    let _ = writeln!(
                        out,
                        "\n> {} `{}` could not be rendered: {}",
                        artifact.kind.label(),
                        artifact.id,
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NotebookStore};
    use crate::document::CreateResultParams;
    use crate::models::{ArtifactKind, Notebook};
    use serde_json::json;

    struct FailingRenderer;

    #[async_trait]
    impl ArtifactRenderer for FailingRenderer {
        async fn render(&self, _artifact: &Artifact) -> Result<String, ArtifactRenderError> {
            Err(ArtifactRenderError::failed("backend offline"))
        }
    }

    async fn setup() -> (Arc<NotebookDocument>, Analysis) {
        let store = Arc::new(MemoryStore::new());
        let doc = Arc::new(NotebookDocument::new(store.clone()));
        let notebook = store.create_notebook(Notebook::new()).await.unwrap();
        let analysis = Analysis::new(
            notebook.id,
            "Churn study".to_string(),
            Some("Quarterly churn drivers".to_string()),
        );
        (doc, analysis)
    }

    #[tokio::test]
    async fn test_report_structure_headings_and_code() {
        let (doc, analysis) = setup().await;

        let intro = doc
            .append_section(
                &analysis.notebook_id,
                None,
                "Intro".to_string(),
                Some("Scope and data".to_string()),
            )
            .await
            .unwrap();
        let nested = doc
            .append_section(&analysis.notebook_id, Some(&intro.id), "Detail".to_string(), None)
            .await
            .unwrap();
        doc.append_result(
            &intro.id,
            CreateResultParams {
                analysis: "Churn is concentrated in month one.".to_string(),
                python_code: Some("df.groupby('month').churn.mean()".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let renderer = ReportRenderer::new(doc, Arc::new(JsonArtifactRenderer));
        let report = renderer
            .render(&analysis, &ReportOptions::default())
            .await
            .unwrap();

        assert!(report.starts_with("# Churn study\n"));
        assert!(report.contains("Quarterly churn drivers"));
        assert!(report.contains("\n## Intro\n"));
        assert!(report.contains("\n### Detail\n"));
        assert!(report.contains("Churn is concentrated in month one."));
        assert!(report.contains("```python\ndf.groupby('month').churn.mean()\n```"));
        let _ = nested;
    }

    #[tokio::test]
    async fn test_report_can_omit_code() {
        let (doc, analysis) = setup().await;

        let section = doc
            .append_section(&analysis.notebook_id, None, "S".to_string(), None)
            .await
            .unwrap();
        doc.append_result(
            &section.id,
            CreateResultParams {
                analysis: "text".to_string(),
                python_code: Some("secret()".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let renderer = ReportRenderer::new(doc, Arc::new(JsonArtifactRenderer));
        let report = renderer
            .render(&analysis, &ReportOptions { include_code: false })
            .await
            .unwrap();

        assert!(report.contains("text"));
        assert!(!report.contains("secret()"));
        assert!(!report.contains("```python"));
    }

    #[tokio::test]
    async fn test_failing_artifact_yields_placeholder_not_error() {
        let (doc, analysis) = setup().await;

        let section = doc
            .append_section(&analysis.notebook_id, None, "Charts".to_string(), None)
            .await
            .unwrap();
        let artifact = Artifact::new(ArtifactKind::Plot, json!({"mark": "line"}));
        let artifact_id = artifact.id.clone();
        doc.append_result(
            &section.id,
            CreateResultParams {
                analysis: "Trend below.".to_string(),
                artifacts: vec![artifact],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let renderer = ReportRenderer::new(doc, Arc::new(FailingRenderer));
        let report = renderer
            .render(&analysis, &ReportOptions::default())
            .await
            .unwrap();

        assert!(report.contains("Trend below."));
        assert!(report.contains(&artifact_id));
        assert!(report.contains("could not be rendered"));
        assert!(report.contains("backend offline"));
    }

    #[tokio::test]
    async fn test_json_artifact_renderer_emits_fenced_spec() {
        let artifact = Artifact::new(ArtifactKind::Table, json!({"columns": ["a"]}));
        let fragment = JsonArtifactRenderer.render(&artifact).await.unwrap();
        assert!(fragment.contains("```json"));
        assert!(fragment.contains("\"columns\""));
        assert!(fragment.contains(&artifact.id));
    }
}
