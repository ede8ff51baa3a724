//! Database Layer
//!
//! Persistence for the notebook document model:
//!
//! - [`NotebookStore`] - storage abstraction trait (a dumb repository; all
//!   chain invariants are enforced by the document layer)
//! - [`TursoStore`] / [`DatabaseService`] - libsql embedded backend
//! - [`MemoryStore`] - in-memory backend with a write counter, used by the
//!   unit test suite

mod database;
mod error;
mod memory_store;
mod notebook_store;
mod turso_store;

pub use database::{DatabaseService, DbResultParams, DbSectionParams};
pub use error::DatabaseError;
pub use memory_store::MemoryStore;
pub use notebook_store::NotebookStore;
pub use turso_store::TursoStore;
