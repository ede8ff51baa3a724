//! Notebook Document Layer
//!
//! Owns the chain invariants of the notebook document model. Every
//! structural mutation (append, delete-and-relink, move) goes through
//! [`NotebookDocument`], which is the only component allowed to write the
//! chain-affecting fields (`next`, `parent_section_id`, `section_id`).
//!
//! # Concurrency
//!
//! The store gives no isolation across calls, so every multi-step mutation
//! runs inside a per-notebook async mutex. Within one operation all reads
//! that inform later writes complete before the first write is issued
//! (read-then-write-all); this is what keeps a same-scope move from
//! consuming its own splice. Content updates take the same lock because a
//! backend may persist them as full-row rewrites that include the chain
//! columns.
//!
//! # Failure semantics
//!
//! Chain corruption (multiple heads/tails, cycles, dangling pointers) is
//! always surfaced as [`DocumentError::CorruptChain`] with the scope and
//! offending node ids; it is never silently repaired.

pub mod chain;
mod error;

pub use chain::{ChainError, ChainNode};
pub use error::DocumentError;

use crate::db::NotebookStore;
use crate::models::{
    AnalysisResult, Artifact, NodeRef, ResultUpdate, Section, SectionUpdate,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Identifies one chain container: either the top-level scope of a
/// notebook (`section_id = None`) or the interior of a section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Owning notebook
    pub notebook_id: String,

    /// Containing section, or `None` for the notebook's top-level scope
    pub section_id: Option<String>,
}

impl Scope {
    /// Top-level scope of a notebook
    pub fn root(notebook_id: impl Into<String>) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            section_id: None,
        }
    }

    /// Interior scope of a section
    pub fn section(notebook_id: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            section_id: Some(section_id.into()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section_id {
            Some(section_id) => write!(
                f,
                "section '{}' of notebook '{}'",
                section_id, self.notebook_id
            ),
            None => write!(f, "top-level scope of notebook '{}'", self.notebook_id),
        }
    }
}

/// Recursive materialization of a section: the section itself, its child
/// sections in chain order, and the results directly in it in chain order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTree {
    pub section: Section,
    pub children: Vec<SectionTree>,
    pub results: Vec<AnalysisResult>,
}

/// Parameters for creating a result at the tail of a section
#[derive(Debug, Clone, Default)]
pub struct CreateResultParams {
    /// Free-form analysis text
    pub analysis: String,
    /// Optional code that produced the result
    pub python_code: Option<String>,
    /// Referenced dataset ids
    pub dataset_ids: Vec<String>,
    /// Referenced data-source ids
    pub data_source_ids: Vec<String>,
    /// Attached rendering artifacts
    pub artifacts: Vec<Artifact>,
}

/// Content-only update for a result.
///
/// Deliberately has no `next` / `section_id` fields: position changes go
/// through [`NotebookDocument::move_node`].
#[derive(Debug, Clone, Default)]
pub struct UpdateResultParams {
    pub analysis: Option<String>,
    pub python_code: Option<Option<String>>,
    pub dataset_ids: Option<Vec<String>>,
    pub data_source_ids: Option<Vec<String>>,
    pub artifacts: Option<Vec<Artifact>>,
}

/// Per-notebook async mutex registry.
///
/// Structural mutations of one notebook serialize on its mutex; disjoint
/// notebooks proceed in parallel. Entries are created on first use and
/// kept for the registry's lifetime (one small Arc per notebook).
#[derive(Default)]
struct NotebookLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NotebookLocks {
    fn acquire(&self, notebook_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(notebook_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// The notebook document: chain algorithms over a [`NotebookStore`].
pub struct NotebookDocument {
    store: Arc<dyn NotebookStore>,
    locks: NotebookLocks,
}

impl NotebookDocument {
    /// Create a document layer over the given store
    pub fn new(store: Arc<dyn NotebookStore>) -> Self {
        Self {
            store,
            locks: NotebookLocks::default(),
        }
    }

    /// Access the underlying store (read paths only; chain fields are
    /// written exclusively through this layer)
    pub fn store(&self) -> &Arc<dyn NotebookStore> {
        &self.store
    }

    //
    // LOOKUPS
    //

    async fn require_section(&self, id: &str) -> Result<Section, DocumentError> {
        self.store
            .get_section(id)
            .await?
            .ok_or_else(|| DocumentError::section_not_found(id))
    }

    async fn require_result(&self, id: &str) -> Result<AnalysisResult, DocumentError> {
        self.store
            .get_result(id)
            .await?
            .ok_or_else(|| DocumentError::result_not_found(id))
    }

    async fn require_notebook(&self, id: &str) -> Result<(), DocumentError> {
        self.store
            .get_notebook(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| DocumentError::notebook_not_found(id))
    }

    /// Fetch a node by typed reference
    async fn fetch_node(&self, node: &NodeRef) -> Result<ChainNode, DocumentError> {
        match node {
            NodeRef::Section(id) => Ok(ChainNode::Section(self.require_section(id).await?)),
            NodeRef::Result(id) => Ok(ChainNode::Result(self.require_result(id).await?)),
        }
    }

    /// The scope a node currently lives in
    async fn node_scope(&self, node: &ChainNode) -> Result<Scope, DocumentError> {
        match node {
            ChainNode::Section(s) => Ok(Scope {
                notebook_id: s.notebook_id.clone(),
                section_id: s.parent_section_id.clone(),
            }),
            ChainNode::Result(r) => {
                let owner = self.require_section(&r.section_id).await?;
                Ok(Scope::section(owner.notebook_id, owner.id))
            }
        }
    }

    /// Fetch all members of a scope, unordered.
    ///
    /// The top-level scope holds only sections; a section scope holds its
    /// direct child sections and the results directly in it.
    async fn scope_members(&self, scope: &Scope) -> Result<Vec<ChainNode>, DocumentError> {
        let sections = self
            .store
            .list_sections(&scope.notebook_id, scope.section_id.as_deref())
            .await?;

        let mut members: Vec<ChainNode> = sections.into_iter().map(ChainNode::Section).collect();

        if let Some(section_id) = &scope.section_id {
            let results = self.store.list_results(section_id).await?;
            members.extend(results.into_iter().map(ChainNode::Result));
        }

        Ok(members)
    }

    /// Rewrite a node's `next` pointer
    async fn set_next(&self, node: &NodeRef, next: Option<NodeRef>) -> Result<(), DocumentError> {
        match node {
            NodeRef::Section(id) => {
                self.store
                    .update_section(
                        id,
                        SectionUpdate {
                            next: Some(next),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            NodeRef::Result(id) => {
                self.store
                    .update_result(
                        id,
                        ResultUpdate {
                            next: Some(next),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }

    //
    // READ OPERATIONS
    //

    /// Materialize the ordered sequence of one scope.
    ///
    /// Fails with [`DocumentError::CorruptChain`] when the scope violates
    /// the single-chain invariant.
    pub async fn ordered_scope(&self, scope: &Scope) -> Result<Vec<ChainNode>, DocumentError> {
        if let Some(section_id) = &scope.section_id {
            self.require_section(section_id).await?;
        } else {
            self.require_notebook(&scope.notebook_id).await?;
        }

        let members = self.scope_members(scope).await?;
        chain::order(members).map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))
    }

    /// Recursively materialize a section: ordered child sections and
    /// results, partitioned by kind while preserving chain order.
    pub async fn tree(&self, section_id: &str) -> Result<SectionTree, DocumentError> {
        let section = self.require_section(section_id).await?;
        self.tree_from(section).await
    }

    /// Materialize every top-level section of a notebook, in chain order
    pub async fn notebook_tree(&self, notebook_id: &str) -> Result<Vec<SectionTree>, DocumentError> {
        self.require_notebook(notebook_id).await?;

        let ordered = self.ordered_scope(&Scope::root(notebook_id)).await?;
        let mut trees = Vec::with_capacity(ordered.len());
        for node in ordered {
            match node {
                ChainNode::Section(section) => trees.push(self.tree_from(section).await?),
                // The top-level scope is populated from the sections table
                // only, so a result here is unreachable; fail loudly if the
                // store ever misbehaves.
                ChainNode::Result(r) => {
                    return Err(DocumentError::corrupt_chain(
                        Scope::root(notebook_id).to_string(),
                        ChainError::DanglingNext {
                            from_id: notebook_id.to_string(),
                            to_id: r.id,
                        },
                    ));
                }
            }
        }
        Ok(trees)
    }

    fn tree_from<'a>(
        &'a self,
        section: Section,
    ) -> Pin<Box<dyn Future<Output = Result<SectionTree, DocumentError>> + Send + 'a>> {
        Box::pin(async move {
            let scope = Scope::section(section.notebook_id.clone(), section.id.clone());
            let members = self.scope_members(&scope).await?;
            let ordered = chain::order(members)
                .map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))?;

            let mut children = Vec::new();
            let mut results = Vec::new();
            for node in ordered {
                match node {
                    ChainNode::Section(child) => children.push(self.tree_from(child).await?),
                    ChainNode::Result(result) => results.push(result),
                }
            }

            Ok(SectionTree {
                section,
                children,
                results,
            })
        })
    }

    //
    // STRUCTURAL MUTATIONS
    //

    /// Create a section at the tail of its target scope.
    ///
    /// `parent_section_id = None` appends to the notebook's top-level
    /// scope; otherwise the parent must exist and belong to the notebook.
    pub async fn append_section(
        &self,
        notebook_id: &str,
        parent_section_id: Option<&str>,
        name: String,
        description: Option<String>,
    ) -> Result<Section, DocumentError> {
        self.require_notebook(notebook_id).await?;

        if let Some(parent_id) = parent_section_id {
            let parent = self.require_section(parent_id).await?;
            if parent.notebook_id != notebook_id {
                return Err(DocumentError::invalid_move(
                    parent_id,
                    format!(
                        "parent section belongs to notebook '{}', not '{}'",
                        parent.notebook_id, notebook_id
                    ),
                ));
            }
        }

        let lock = self.locks.acquire(notebook_id);
        let _guard = lock.lock().await;

        let scope = Scope {
            notebook_id: notebook_id.to_string(),
            section_id: parent_section_id.map(String::from),
        };
        let members = self.scope_members(&scope).await?;
        let tail = chain::find_tail(&members)
            .map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))?
            .map(|t| t.node_ref());

        let section = Section::new(
            notebook_id.to_string(),
            parent_section_id.map(String::from),
            name,
            description,
        );
        let created = self.store.create_section(section).await?;

        if let Some(tail_ref) = tail {
            self.set_next(&tail_ref, Some(created.node_ref())).await?;
        }

        tracing::debug!(section_id = %created.id, "appended section at tail of {}", scope);
        Ok(created)
    }

    /// Create a result at the tail of a section's scope
    pub async fn append_result(
        &self,
        section_id: &str,
        params: CreateResultParams,
    ) -> Result<AnalysisResult, DocumentError> {
        let owner = self.require_section(section_id).await?;

        let lock = self.locks.acquire(&owner.notebook_id);
        let _guard = lock.lock().await;

        let scope = Scope::section(owner.notebook_id.clone(), owner.id.clone());
        let members = self.scope_members(&scope).await?;
        let tail = chain::find_tail(&members)
            .map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))?
            .map(|t| t.node_ref());

        let mut result = AnalysisResult::new(section_id.to_string(), params.analysis);
        result.python_code = params.python_code;
        result.dataset_ids = params.dataset_ids;
        result.data_source_ids = params.data_source_ids;
        result.artifacts = params.artifacts;

        let created = self.store.create_result(result).await?;

        if let Some(tail_ref) = tail {
            self.set_next(&tail_ref, Some(created.node_ref())).await?;
        }

        tracing::debug!(result_id = %created.id, "appended result at tail of {}", scope);
        Ok(created)
    }

    /// Delete a section: tear down its whole subtree (results and
    /// descendant sections, depth-first), splice it out of its scope, then
    /// remove it.
    ///
    /// The predecessor is computed before any row is removed; splicing
    /// after removal would lose the `next` reference.
    pub async fn delete_section(&self, id: &str) -> Result<(), DocumentError> {
        let section = self.require_section(id).await?;

        let lock = self.locks.acquire(&section.notebook_id);
        let _guard = lock.lock().await;

        // Re-read inside the lock; a concurrent mutation may have moved it.
        let section = self.require_section(id).await?;
        let scope = Scope {
            notebook_id: section.notebook_id.clone(),
            section_id: section.parent_section_id.clone(),
        };

        let members = self.scope_members(&scope).await?;
        let predecessor = chain::find_predecessor(&members, &section.node_ref())
            .map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))?
            .map(|p| p.node_ref());

        self.teardown_section(&section).await?;

        if let Some(pred) = predecessor {
            self.set_next(&pred, section.next.clone()).await?;
        }

        self.store.delete_section(&section.id).await?;
        tracing::debug!(section_id = %id, "deleted section from {}", scope);
        Ok(())
    }

    /// Depth-first removal of everything inside a section (but not the
    /// section row itself). Whole scopes vanish, so no relinking is needed
    /// below the deletion root.
    fn teardown_section<'a>(
        &'a self,
        section: &'a Section,
    ) -> Pin<Box<dyn Future<Output = Result<(), DocumentError>> + Send + 'a>> {
        Box::pin(async move {
            for result in self.store.list_results(&section.id).await? {
                self.store.delete_result(&result.id).await?;
            }

            for child in self
                .store
                .list_sections(&section.notebook_id, Some(&section.id))
                .await?
            {
                self.teardown_section(&child).await?;
                self.store.delete_section(&child.id).await?;
            }

            Ok(())
        })
    }

    /// Delete a result: splice it out of its section's chain, then remove
    /// it (the store drops artifact and association rows with it).
    pub async fn delete_result(&self, id: &str) -> Result<(), DocumentError> {
        let result = self.require_result(id).await?;
        let owner = self.require_section(&result.section_id).await?;

        let lock = self.locks.acquire(&owner.notebook_id);
        let _guard = lock.lock().await;

        let result = self.require_result(id).await?;
        let scope = Scope::section(owner.notebook_id.clone(), result.section_id.clone());

        let members = self.scope_members(&scope).await?;
        let predecessor = chain::find_predecessor(&members, &result.node_ref())
            .map_err(|e| DocumentError::corrupt_chain(scope.to_string(), e))?
            .map(|p| p.node_ref());

        if let Some(pred) = predecessor {
            self.set_next(&pred, result.next.clone()).await?;
        }

        self.store.delete_result(&result.id).await?;
        tracing::debug!(result_id = %id, "deleted result from {}", scope);
        Ok(())
    }

    /// Move a node to `new_scope`, placing it immediately before `before`,
    /// or at the scope's tail when `before` is `None`.
    ///
    /// Handles pure reorders (`new_scope == old_scope`) and cross-scope
    /// moves with one algorithm. All validations and both predecessor
    /// lookups complete before the first write; running the destination
    /// lookup after the splice would read a chain the splice already
    /// altered when both ends share a scope.
    ///
    /// A move to the position the node already occupies returns without
    /// issuing any write.
    pub async fn move_node(
        &self,
        node: NodeRef,
        new_scope: Scope,
        before: Option<NodeRef>,
    ) -> Result<(), DocumentError> {
        if before.as_ref() == Some(&node) {
            return Err(DocumentError::invalid_move(
                node.id(),
                "a node cannot be its own successor",
            ));
        }

        // Resolve the owning notebook, then serialize with every other
        // structural mutation of it before reading chain state.
        let moving = self.fetch_node(&node).await?;
        let old_scope_probe = self.node_scope(&moving).await?;
        if old_scope_probe.notebook_id != new_scope.notebook_id {
            return Err(DocumentError::invalid_move(
                node.id(),
                "moves across notebooks are not supported",
            ));
        }

        let lock = self.locks.acquire(&new_scope.notebook_id);
        let _guard = lock.lock().await;

        // Fresh reads inside the lock.
        let moving = self.fetch_node(&node).await?;
        let old_scope = self.node_scope(&moving).await?;

        self.validate_move_target(&moving, &new_scope).await?;

        if let Some(before_ref) = &before {
            let target = self.fetch_node(before_ref).await?;
            let target_scope = self.node_scope(&target).await?;
            if target_scope != new_scope {
                return Err(DocumentError::invalid_move(
                    node.id(),
                    format!(
                        "requested successor '{}' lives in {}, not in {}",
                        before_ref.id(),
                        target_scope,
                        new_scope
                    ),
                ));
            }
        }

        // No-op: already in the requested scope and position.
        if old_scope == new_scope && moving.next() == &before {
            tracing::debug!(node_id = %node.id(), "move is a no-op, zero writes");
            return Ok(());
        }

        // READ PHASE - both predecessor lookups, each against its own
        // scope, before any write.
        let new_members = self.scope_members(&new_scope).await?;
        let new_predecessor = match &before {
            Some(before_ref) => chain::find_predecessor(&new_members, before_ref)
                .map_err(|e| DocumentError::corrupt_chain(new_scope.to_string(), e))?
                .map(|p| p.node_ref()),
            None => chain::find_tail(&new_members)
                .map_err(|e| DocumentError::corrupt_chain(new_scope.to_string(), e))?
                .map(|t| t.node_ref()),
        };

        let old_members = if old_scope == new_scope {
            new_members
        } else {
            self.scope_members(&old_scope).await?
        };
        let old_predecessor = chain::find_predecessor(&old_members, &node)
            .map_err(|e| DocumentError::corrupt_chain(old_scope.to_string(), e))?
            .map(|p| p.node_ref());

        // The moving node itself can surface as the destination
        // predecessor only in positions the no-op check already returned
        // for; anything else is a corrupt chain.
        if new_predecessor.as_ref() == Some(&node) {
            return Err(DocumentError::corrupt_chain(
                new_scope.to_string(),
                ChainError::Cycle {
                    node_id: node.id().to_string(),
                },
            ));
        }

        // WRITE PHASE - splice out of the old chain, re-link into the new
        // one, point the destination predecessor at the node.
        if let Some(old_pred) = &old_predecessor {
            self.set_next(old_pred, moving.next().clone()).await?;
        }

        match &node {
            NodeRef::Section(id) => {
                self.store
                    .update_section(
                        id,
                        SectionUpdate {
                            parent_section_id: Some(new_scope.section_id.clone()),
                            next: Some(before.clone()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            NodeRef::Result(id) => {
                // validate_move_target already rejected a root destination
                let section_id = new_scope.section_id.clone().ok_or_else(|| {
                    DocumentError::invalid_move(
                        id.clone(),
                        "results cannot live in a notebook's top-level scope",
                    )
                })?;
                self.store
                    .update_result(
                        id,
                        ResultUpdate {
                            section_id: Some(section_id),
                            next: Some(before.clone()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        if let Some(new_pred) = &new_predecessor {
            self.set_next(new_pred, Some(node.clone())).await?;
        }

        tracing::debug!(
            node_id = %node.id(),
            "moved node from {} to {}",
            old_scope,
            new_scope
        );
        Ok(())
    }

    /// Destination checks that must pass before any write: the scope must
    /// exist in the same notebook, results must land inside a section, and
    /// a section may not move under itself or any of its descendants.
    async fn validate_move_target(
        &self,
        moving: &ChainNode,
        new_scope: &Scope,
    ) -> Result<(), DocumentError> {
        self.require_notebook(&new_scope.notebook_id).await?;

        let target_section = match &new_scope.section_id {
            Some(section_id) => {
                let section = self.require_section(section_id).await?;
                if section.notebook_id != new_scope.notebook_id {
                    return Err(DocumentError::invalid_move(
                        moving.id(),
                        format!(
                            "destination section '{}' belongs to notebook '{}'",
                            section_id, section.notebook_id
                        ),
                    ));
                }
                Some(section)
            }
            None => None,
        };

        match moving {
            ChainNode::Result(_) => {
                if target_section.is_none() {
                    return Err(DocumentError::invalid_move(
                        moving.id(),
                        "results cannot live in a notebook's top-level scope",
                    ));
                }
            }
            ChainNode::Section(section) => {
                // Walk the destination's ancestry; finding the moving
                // section there would fold the tree into itself.
                let mut visited: HashSet<String> = HashSet::new();
                let mut cursor = target_section.clone();
                while let Some(current) = cursor {
                    if current.id == section.id {
                        return Err(DocumentError::invalid_move(
                            section.id.clone(),
                            "cannot move a section into itself or its own descendant",
                        ));
                    }
                    if !visited.insert(current.id.clone()) {
                        return Err(DocumentError::corrupt_chain(
                            format!("section nesting of notebook '{}'", new_scope.notebook_id),
                            ChainError::Cycle {
                                node_id: current.id,
                            },
                        ));
                    }
                    cursor = match current.parent_section_id {
                        Some(parent_id) => Some(self.require_section(&parent_id).await?),
                        None => None,
                    };
                }
            }
        }

        Ok(())
    }

    //
    // CONTENT UPDATES (never touch chain fields)
    //
    // A store backend may persist an update as a read-merge-write of the
    // full row, chain columns included, so even a name-only update must
    // hold the notebook lock: interleaving it with a move's write phase
    // would write the pre-move pointers back.

    /// Update a section's presentation fields
    pub async fn update_section(
        &self,
        id: &str,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Section, DocumentError> {
        let section = self.require_section(id).await?;

        let lock = self.locks.acquire(&section.notebook_id);
        let _guard = lock.lock().await;

        Ok(self
            .store
            .update_section(
                id,
                SectionUpdate {
                    name,
                    description,
                    ..Default::default()
                },
            )
            .await?)
    }

    /// Update a result's content fields
    pub async fn update_result(
        &self,
        id: &str,
        params: UpdateResultParams,
    ) -> Result<AnalysisResult, DocumentError> {
        let result = self.require_result(id).await?;
        let owner = self.require_section(&result.section_id).await?;

        let lock = self.locks.acquire(&owner.notebook_id);
        let _guard = lock.lock().await;

        Ok(self
            .store
            .update_result(
                id,
                ResultUpdate {
                    analysis: params.analysis,
                    python_code: params.python_code,
                    dataset_ids: params.dataset_ids,
                    data_source_ids: params.data_source_ids,
                    artifacts: params.artifacts,
                    ..Default::default()
                },
            )
            .await?)
    }
}
