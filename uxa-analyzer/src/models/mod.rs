//! Data models for uxa-analyzer
//!
//! - Assessment report and problem areas (service #1 output)
//! - Localized elements (service #2 output)
//! - Run state machine, manifest and summary

pub mod assessment;
pub mod localization;
pub mod manifest;
pub mod narrative;
pub mod run_session;
pub mod screen_image;

pub use assessment::{
    AssessmentReport, Category, CategoryBlock, ProblemArea, SchemaViolation, SeverityDistribution,
};
pub use localization::{BoundingBox, LocalizationDocument, LocalizedElement, PixelBox};
pub use manifest::{
    Deliverable, DeliverableStatus, FailurePolicy, RunManifest, RunSummary, Stage, StageOutcome,
    StageRecord,
};
pub use narrative::{NarrativeArtifact, NarrativeKind, StrategicInterpretation, StrategicRecommendation};
pub use run_session::{RunSession, RunState, StateTransition};
pub use screen_image::{ContextHints, InputRecord, ScreenImage, NOT_SPECIFIED};
