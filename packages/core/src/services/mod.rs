//! Service Layer
//!
//! User-facing operations above the document layer. Currently one service:
//! [`AnalysisService`], which owns the analysis/notebook lifecycle and the
//! aggregate link queries.

mod analysis_service;
mod error;

pub use analysis_service::AnalysisService;
pub use error::AnalysisServiceError;
