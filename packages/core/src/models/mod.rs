//! Data Models
//!
//! This module contains the core data structures of the notebook document
//! model:
//!
//! - `Section` / `AnalysisResult` - the two chained node kinds
//! - `NodeRef` - tagged successor union replacing stringly-typed pointers
//! - `Notebook` / `Analysis` - root container and its user-facing wrapper

mod analysis;
mod node;

pub use analysis::{Analysis, AnalysisUpdate, Notebook};
pub use node::{
    AnalysisResult, Artifact, ArtifactKind, NodeRef, ResultUpdate, Section, SectionUpdate,
};
