//! MemoryStore - In-Memory NotebookStore Backend
//!
//! HashMap-backed implementation of [`NotebookStore`]. Used by the unit
//! test suite (no database file, no I/O) and as a lightweight backend for
//! embedding the document model without libsql.
//!
//! The store counts every mutating call (`create_*`, `update_*`,
//! `delete_*`) in an atomic counter exposed via [`MemoryStore::write_count`].
//! Tests use this to assert that no-op operations issue zero writes.

use crate::db::notebook_store::NotebookStore;
use crate::models::{
    Analysis, AnalysisResult, AnalysisUpdate, Notebook, ResultUpdate, Section, SectionUpdate,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// In-memory notebook store with a write counter.
///
/// All state lives behind one `RwLock`; no await point ever holds the
/// guard, so the lock is a plain `std::sync` one.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    writes: AtomicU64,
}

#[derive(Default)]
struct State {
    sections: HashMap<String, Section>,
    results: HashMap<String, AnalysisResult>,
    notebooks: HashMap<String, Notebook>,
    analyses: HashMap<String, Analysis>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating store calls issued so far.
    ///
    /// Reads are not counted. One logical operation in the document layer
    /// may account for several writes (e.g. a move touches up to three
    /// records).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        // Lock poisoning only happens if a writer panicked; propagating the
        // inner state is still sound for a test-oriented store.
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotebookStore for MemoryStore {
    async fn create_section(&self, section: Section) -> Result<Section> {
        self.record_write();
        let mut state = self.lock_write();
        if state.sections.contains_key(&section.id) {
            return Err(anyhow!("Duplicate section id '{}'", section.id));
        }
        state.sections.insert(section.id.clone(), section.clone());
        Ok(section)
    }

    async fn get_section(&self, id: &str) -> Result<Option<Section>> {
        Ok(self.lock_read().sections.get(id).cloned())
    }

    async fn list_sections(
        &self,
        notebook_id: &str,
        parent_section_id: Option<&str>,
    ) -> Result<Vec<Section>> {
        Ok(self
            .lock_read()
            .sections
            .values()
            .filter(|s| {
                s.notebook_id == notebook_id
                    && s.parent_section_id.as_deref() == parent_section_id
            })
            .cloned()
            .collect())
    }

    async fn update_section(&self, id: &str, update: SectionUpdate) -> Result<Section> {
        self.record_write();
        let mut state = self.lock_write();
        let section = state
            .sections
            .get_mut(id)
            .ok_or_else(|| anyhow!("Section '{}' does not exist", id))?;

        if let Some(name) = update.name {
            section.name = name;
        }
        if let Some(description) = update.description {
            section.description = description;
        }
        if let Some(parent) = update.parent_section_id {
            section.parent_section_id = parent;
        }
        if let Some(next) = update.next {
            section.next = next;
        }
        section.modified_at = Utc::now();
        Ok(section.clone())
    }

    async fn delete_section(&self, id: &str) -> Result<()> {
        self.record_write();
        self.lock_write().sections.remove(id);
        Ok(())
    }

    async fn create_result(&self, result: AnalysisResult) -> Result<AnalysisResult> {
        self.record_write();
        let mut state = self.lock_write();
        if state.results.contains_key(&result.id) {
            return Err(anyhow!("Duplicate result id '{}'", result.id));
        }
        state.results.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn get_result(&self, id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.lock_read().results.get(id).cloned())
    }

    async fn list_results(&self, section_id: &str) -> Result<Vec<AnalysisResult>> {
        Ok(self
            .lock_read()
            .results
            .values()
            .filter(|r| r.section_id == section_id)
            .cloned()
            .collect())
    }

    async fn update_result(&self, id: &str, update: ResultUpdate) -> Result<AnalysisResult> {
        self.record_write();
        let mut state = self.lock_write();
        let result = state
            .results
            .get_mut(id)
            .ok_or_else(|| anyhow!("Result '{}' does not exist", id))?;

        if let Some(analysis) = update.analysis {
            result.analysis = analysis;
        }
        if let Some(code) = update.python_code {
            result.python_code = code;
        }
        if let Some(dataset_ids) = update.dataset_ids {
            result.dataset_ids = dataset_ids;
        }
        if let Some(data_source_ids) = update.data_source_ids {
            result.data_source_ids = data_source_ids;
        }
        if let Some(artifacts) = update.artifacts {
            result.artifacts = artifacts;
        }
        if let Some(section_id) = update.section_id {
            result.section_id = section_id;
        }
        if let Some(next) = update.next {
            result.next = next;
        }
        result.modified_at = Utc::now();
        Ok(result.clone())
    }

    async fn delete_result(&self, id: &str) -> Result<()> {
        self.record_write();
        self.lock_write().results.remove(id);
        Ok(())
    }

    async fn create_notebook(&self, notebook: Notebook) -> Result<Notebook> {
        self.record_write();
        self.lock_write()
            .notebooks
            .insert(notebook.id.clone(), notebook.clone());
        Ok(notebook)
    }

    async fn get_notebook(&self, id: &str) -> Result<Option<Notebook>> {
        Ok(self.lock_read().notebooks.get(id).cloned())
    }

    async fn delete_notebook(&self, id: &str) -> Result<()> {
        self.record_write();
        self.lock_write().notebooks.remove(id);
        Ok(())
    }

    async fn create_analysis(&self, analysis: Analysis) -> Result<Analysis> {
        self.record_write();
        self.lock_write()
            .analyses
            .insert(analysis.id.clone(), analysis.clone());
        Ok(analysis)
    }

    async fn get_analysis(&self, id: &str) -> Result<Option<Analysis>> {
        Ok(self.lock_read().analyses.get(id).cloned())
    }

    async fn list_analyses(&self) -> Result<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> = self.lock_read().analyses.values().cloned().collect();
        analyses.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(analyses)
    }

    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> Result<Analysis> {
        self.record_write();
        let mut state = self.lock_write();
        let analysis = state
            .analyses
            .get_mut(id)
            .ok_or_else(|| anyhow!("Analysis '{}' does not exist", id))?;

        if let Some(name) = update.name {
            analysis.name = name;
        }
        if let Some(description) = update.description {
            analysis.description = description;
        }
        analysis.modified_at = Utc::now();
        Ok(analysis.clone())
    }

    async fn delete_analysis(&self, id: &str) -> Result<()> {
        self.record_write();
        self.lock_write().analyses.remove(id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_section_crud_round_trip() {
        let store = MemoryStore::new();
        let notebook = store.create_notebook(Notebook::new()).await.unwrap();

        let section = Section::new(notebook.id.clone(), None, "Intro".to_string(), None);
        let created = store.create_section(section.clone()).await.unwrap();
        assert_eq!(created.id, section.id);

        let fetched = store.get_section(&section.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Intro");

        let updated = store
            .update_section(
                &section.id,
                SectionUpdate {
                    name: Some("Introduction".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Introduction");

        store.delete_section(&section.id).await.unwrap();
        assert!(store.get_section(&section.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sections_filters_by_scope() {
        let store = MemoryStore::new();
        let notebook = store.create_notebook(Notebook::new()).await.unwrap();

        let top = Section::new(notebook.id.clone(), None, "Top".to_string(), None);
        let top_id = top.id.clone();
        store.create_section(top).await.unwrap();

        let child = Section::new(
            notebook.id.clone(),
            Some(top_id.clone()),
            "Child".to_string(),
            None,
        );
        store.create_section(child).await.unwrap();

        let roots = store.list_sections(&notebook.id, None).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "Top");

        let children = store
            .list_sections(&notebook.id, Some(&top_id))
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "Child");
    }

    #[tokio::test]
    async fn test_write_count_tracks_mutations_only() {
        let store = MemoryStore::new();
        let notebook = store.create_notebook(Notebook::new()).await.unwrap();
        assert_eq!(store.write_count(), 1);

        store.get_notebook(&notebook.id).await.unwrap();
        store.list_sections(&notebook.id, None).await.unwrap();
        assert_eq!(store.write_count(), 1, "reads must not count as writes");

        let section = Section::new(notebook.id.clone(), None, "A".to_string(), None);
        store.create_section(section).await.unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_section_id_rejected() {
        let store = MemoryStore::new();
        let section = Section::new("nb".to_string(), None, "A".to_string(), None);
        store.create_section(section.clone()).await.unwrap();
        assert!(store.create_section(section).await.is_err());
    }
}
