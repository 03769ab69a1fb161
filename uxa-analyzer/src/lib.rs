//! uxa-analyzer library interface
//!
//! Exposes the analysis pipeline for the binary and for integration tests.

pub mod config;
pub mod error;
pub mod heatmap;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::config::AnalyzerConfig;
pub use crate::error::{PipelineError, RenderError, ServiceError};
pub use crate::models::{RunManifest, RunSummary};
pub use crate::services::workflow_orchestrator::{
    PipelineServices, PipelineSettings, RunOutcome, RunRequest, WorkflowOrchestrator, MANIFEST_FILE,
};
