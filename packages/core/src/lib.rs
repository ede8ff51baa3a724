//! Labbook Core - Ordered Analysis Documents
//!
//! This crate provides the data model, chain algorithms, and service
//! orchestration for Labbook analysis notebooks: ordered documents of
//! nested sections and analysis results.
//!
//! # Architecture
//!
//! - **Pointer-chained ordering**: every scope is a singly linked list
//!   through tagged `next` references; insert, delete, and move are O(1)
//!   in writes and never renumber siblings
//! - **Dumb store, smart document**: the storage trait persists records
//!   by id and scope; all chain invariants live in the document layer
//! - **libsql/Turso**: embedded SQLite-compatible database backend, with
//!   an in-memory backend for tests and embedding
//! - **Corruption is loud**: a broken chain is reported with the scope
//!   and offending node ids, never silently repaired
//!
//! # Modules
//!
//! - [`models`] - Data structures (Section, AnalysisResult, Analysis, ...)
//! - [`document`] - Chain algorithms and the NotebookDocument layer
//! - [`report`] - Markdown report rendering
//! - [`services`] - Business services (AnalysisService)
//! - [`db`] - Database layer with libsql integration

pub mod models;
pub mod document;
pub mod report;
pub mod services;
pub mod db;

// Re-export commonly used types
pub use models::*;
pub use document::{
    ChainError, ChainNode, CreateResultParams, DocumentError, NotebookDocument, Scope,
    SectionTree, UpdateResultParams,
};
pub use report::{
    ArtifactRenderError, ArtifactRenderer, JsonArtifactRenderer, ReportOptions, ReportRenderer,
};
pub use services::*;
