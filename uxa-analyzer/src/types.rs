//! Collaborator traits for the analysis pipeline
//!
//! The orchestrator only talks to external collaborators through these
//! traits. Production implementations live in `services`; tests substitute
//! in-process fakes.
//!
//! - **AssessmentService:** screenshot → structured assessment JSON
//! - **LocalizationService:** screenshot + prompt → bounding box JSON (best effort)
//! - **NarrativeService:** prompt → free-form narrative text
//! - **ReportRenderer:** manifest-confirmed artifacts → report document

use crate::error::{RenderError, ServiceError};
use crate::models::{
    AssessmentReport, ContextHints, LocalizedElement, NarrativeArtifact, NarrativeKind, ScreenImage,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Inference services
// ============================================================================

/// Structured usability assessment (external service #1)
#[async_trait::async_trait]
pub trait AssessmentService: Send + Sync {
    /// Service name for logs and diagnostics
    fn name(&self) -> &str;

    /// Return the assessment as JSON text
    async fn assess(&self, image: &ScreenImage, hints: &ContextHints) -> Result<String, ServiceError>;
}

/// Region localization (external service #2)
#[async_trait::async_trait]
pub trait LocalizationService: Send + Sync {
    fn name(&self) -> &str;

    /// Return the raw model text; it may or may not be clean JSON
    async fn localize(&self, image: &ScreenImage, prompt: &str) -> Result<String, ServiceError>;
}

/// Narrative generation (interpretation, recommendations)
#[async_trait::async_trait]
pub trait NarrativeService: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, kind: NarrativeKind, prompt: &str) -> Result<String, ServiceError>;
}

// ============================================================================
// Report assembly
// ============================================================================

/// Artifacts handed to the report renderer
///
/// Only artifacts confirmed by the run manifest are present.
#[derive(Debug)]
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub image: &'a ScreenImage,
    pub hints: &'a ContextHints,
    pub assessment: &'a AssessmentReport,
    /// Localized elements (empty when localization did not succeed)
    pub localized: &'a [LocalizedElement],
    /// Heatmap image; None means the renderer substitutes a placeholder
    pub heatmap: Option<&'a Path>,
    pub interpretation: Option<&'a NarrativeArtifact>,
    pub recommendations: Option<&'a NarrativeArtifact>,
    /// Non-fatal diagnostics accumulated so far
    pub diagnostics: Vec<String>,
}

/// Fidelity of the delivered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFidelity {
    /// Converted final document
    Rendered,
    /// Source document only (conversion unavailable or failed)
    Source,
}

/// Files the renderer wrote
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    /// Report source document
    pub source_path: PathBuf,
    /// Primary deliverable: rendered document, or the source when degraded
    pub document_path: PathBuf,
    pub fidelity: ReportFidelity,
    /// Placeholder image written in place of a missing heatmap
    pub placeholder_path: Option<PathBuf>,
    /// Degradation notes
    pub notes: Vec<String>,
}

/// Report assembly collaborator
#[async_trait::async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Write the report into `out_dir`
    async fn render(&self, input: &ReportInput<'_>, out_dir: &Path) -> Result<ReportOutput, RenderError>;
}
