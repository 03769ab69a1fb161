//! Test Helper Utilities
//!
//! Shared utilities for testing uxa-analyzer

#![allow(dead_code)]

pub mod fake_services;
pub mod fixtures;
pub mod image_generator;
pub mod log_capture;

// Re-export commonly used items
pub use fake_services::{FailingRenderer, FakeAssessment, FakeLocalization, FakeNarrative, Reply};
pub use fixtures::{assessment_json, localization_json};
pub use image_generator::{write_test_png, write_truncated_png};
pub use log_capture::{init_test_logging, LogCapture};

use std::path::Path;
use std::sync::Arc;
use uxa_analyzer::services::MarkdownReportRenderer;
use uxa_analyzer::types::ReportRenderer;
use uxa_analyzer::utils::RetryPolicy;
use uxa_analyzer::{PipelineServices, PipelineSettings, WorkflowOrchestrator};

/// Fakes plus the orchestrator built from them
pub struct TestPipeline {
    pub assessment: Arc<FakeAssessment>,
    pub localization: Arc<FakeLocalization>,
    pub narrative: Arc<FakeNarrative>,
    pub orchestrator: WorkflowOrchestrator,
}

/// Settings rooted in `root`, with millisecond retry backoff
pub fn test_settings(root: &Path) -> PipelineSettings {
    let mut settings = PipelineSettings::new(root.join("work"), root.join("out"));
    settings.retry = RetryPolicy {
        max_retries: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        max_elapsed_ms: 5_000,
    };
    settings
}

/// Orchestrator over the given fakes and the real Markdown renderer
pub fn build_pipeline(
    assessment: FakeAssessment,
    localization: FakeLocalization,
    narrative: FakeNarrative,
    settings: PipelineSettings,
) -> TestPipeline {
    build_pipeline_with_renderer(
        assessment,
        localization,
        narrative,
        Arc::new(MarkdownReportRenderer::default()),
        settings,
    )
}

/// Orchestrator over the given fakes and report renderer
pub fn build_pipeline_with_renderer(
    assessment: FakeAssessment,
    localization: FakeLocalization,
    narrative: FakeNarrative,
    report: Arc<dyn ReportRenderer>,
    settings: PipelineSettings,
) -> TestPipeline {
    let assessment = Arc::new(assessment);
    let localization = Arc::new(localization);
    let narrative = Arc::new(narrative);

    let services = PipelineServices {
        assessment: assessment.clone(),
        localization: localization.clone(),
        narrative: narrative.clone(),
        report,
    };

    TestPipeline {
        assessment,
        localization,
        narrative,
        orchestrator: WorkflowOrchestrator::new(services, settings),
    }
}
