//! Run manifest and run summary
//!
//! The manifest is the single source of truth about what a run produced. The
//! orchestrator appends one [`StageRecord`] per stage; downstream consumers
//! (report assembly, the CLI summary) read artifacts only through it.

use crate::models::run_session::RunState;
use crate::models::screen_image::{ContextHints, InputRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Assessment,
    Localization,
    Synthesis,
    Interpretation,
    Recommendation,
    Report,
}

/// What a stage failure does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run
    Fatal,
    /// Record, skip dependents, continue
    Degraded,
}

impl Stage {
    /// Stages in execution order
    pub const PIPELINE: [Stage; 6] = [
        Stage::Assessment,
        Stage::Localization,
        Stage::Synthesis,
        Stage::Interpretation,
        Stage::Recommendation,
        Stage::Report,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Assessment => "assessment",
            Stage::Localization => "localization",
            Stage::Synthesis => "synthesis",
            Stage::Interpretation => "interpretation",
            Stage::Recommendation => "recommendation",
            Stage::Report => "report",
        }
    }

    pub fn policy(self) -> FailurePolicy {
        match self {
            Stage::Assessment => FailurePolicy::Fatal,
            _ => FailurePolicy::Degraded,
        }
    }

    /// Deliverable reported as this stage's `artifact_path`
    pub fn primary_deliverable(self) -> Deliverable {
        match self {
            Stage::Assessment => Deliverable::AssessmentJson,
            Stage::Localization => Deliverable::LocalizationParsed,
            Stage::Synthesis => Deliverable::Heatmap,
            Stage::Interpretation => Deliverable::Interpretation,
            Stage::Recommendation => Deliverable::Recommendations,
            Stage::Report => Deliverable::Report,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Files a run can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deliverable {
    AssessmentJson,
    LocalizationRaw,
    LocalizationParsed,
    Heatmap,
    Interpretation,
    Recommendations,
    ReportSource,
    Report,
    /// Image substituted by the report when no heatmap was confirmed
    HeatmapPlaceholder,
}

impl Deliverable {
    pub const ALL: [Deliverable; 9] = [
        Deliverable::AssessmentJson,
        Deliverable::LocalizationRaw,
        Deliverable::LocalizationParsed,
        Deliverable::Heatmap,
        Deliverable::Interpretation,
        Deliverable::Recommendations,
        Deliverable::ReportSource,
        Deliverable::Report,
        Deliverable::HeatmapPlaceholder,
    ];

    /// Stage that produces this deliverable
    pub fn stage(self) -> Stage {
        match self {
            Deliverable::AssessmentJson => Stage::Assessment,
            Deliverable::LocalizationRaw | Deliverable::LocalizationParsed => Stage::Localization,
            Deliverable::Heatmap => Stage::Synthesis,
            Deliverable::Interpretation => Stage::Interpretation,
            Deliverable::Recommendations => Stage::Recommendation,
            Deliverable::ReportSource | Deliverable::Report | Deliverable::HeatmapPlaceholder => Stage::Report,
        }
    }

    /// File name inside the run directory
    ///
    /// `Report` has no fixed name: it is either the converted document or the
    /// Markdown source.
    pub fn file_name(self) -> &'static str {
        match self {
            Deliverable::AssessmentJson => "assessment.json",
            Deliverable::LocalizationRaw => "localization_raw.txt",
            Deliverable::LocalizationParsed => "localization_parsed.json",
            Deliverable::Heatmap => "heatmap.png",
            Deliverable::Interpretation => "interpretation.json",
            Deliverable::Recommendations => "recommendations.json",
            Deliverable::ReportSource => "report.md",
            Deliverable::Report => "report",
            Deliverable::HeatmapPlaceholder => "heatmap_placeholder.png",
        }
    }
}

/// Result of running one stage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageOutcome {
    pub succeeded: bool,
    pub artifacts: BTreeMap<Deliverable, PathBuf>,
    pub diagnostic: Option<String>,
}

impl StageOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            ..Default::default()
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            artifacts: BTreeMap::new(),
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn with_artifact(mut self, deliverable: Deliverable, path: PathBuf) -> Self {
        self.artifacts.insert(deliverable, path);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

/// Per-stage manifest entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub attempted: bool,
    pub succeeded: bool,
    /// Primary artifact of the stage
    pub artifact_path: Option<PathBuf>,
    /// Every artifact the stage wrote, by deliverable
    #[serde(default)]
    pub artifacts: BTreeMap<Deliverable, PathBuf>,
    pub diagnostic: Option<String>,
    pub duration_ms: Option<u64>,
}

impl StageRecord {
    fn pending(stage: Stage) -> Self {
        Self {
            stage,
            attempted: false,
            succeeded: false,
            artifact_path: None,
            artifacts: BTreeMap::new(),
            diagnostic: None,
            duration_ms: None,
        }
    }
}

/// Record of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub input: InputRecord,
    pub hints: ContextHints,
    /// One record per pipeline stage, in execution order
    pub stages: Vec<StageRecord>,
    /// Directory deliverables were published to (None until published)
    pub output_dir: Option<PathBuf>,
}

impl RunManifest {
    pub fn new(
        run_id: String,
        started_at: DateTime<Utc>,
        input: InputRecord,
        hints: ContextHints,
    ) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: None,
            state: RunState::Init,
            input,
            hints,
            stages: Stage::PIPELINE.iter().copied().map(StageRecord::pending).collect(),
            output_dir: None,
        }
    }

    /// Entry for a stage; None only for a manifest deserialized without it
    pub fn entry(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    fn entry_mut(&mut self, stage: Stage) -> &mut StageRecord {
        let index = match self.stages.iter().position(|r| r.stage == stage) {
            Some(index) => index,
            None => {
                self.stages.push(StageRecord::pending(stage));
                self.stages.len() - 1
            }
        };
        &mut self.stages[index]
    }

    /// Record an attempted stage
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome, duration: Duration) {
        let primary = outcome.artifacts.get(&stage.primary_deliverable()).cloned();
        let entry = self.entry_mut(stage);
        entry.attempted = true;
        entry.succeeded = outcome.succeeded;
        entry.artifact_path = primary;
        entry.artifacts = outcome.artifacts;
        entry.diagnostic = outcome.diagnostic;
        entry.duration_ms = Some(duration.as_millis() as u64);
    }

    /// Record a stage that was not attempted
    pub fn skip(&mut self, stage: Stage, reason: impl Into<String>) {
        let entry = self.entry_mut(stage);
        entry.attempted = false;
        entry.succeeded = false;
        entry.diagnostic = Some(reason.into());
    }

    pub fn succeeded(&self, stage: Stage) -> bool {
        self.entry(stage).map(|r| r.succeeded).unwrap_or(false)
    }

    /// Artifact path, only when its stage succeeded
    pub fn confirmed_artifact(&self, deliverable: Deliverable) -> Option<&Path> {
        self.entry(deliverable.stage())
            .filter(|entry| entry.succeeded)
            .and_then(|entry| entry.artifacts.get(&deliverable))
            .map(PathBuf::as_path)
    }

    /// Assessment, Interpretation and Recommendation all succeeded
    pub fn run_succeeded(&self) -> bool {
        self.succeeded(Stage::Assessment)
            && self.succeeded(Stage::Interpretation)
            && self.succeeded(Stage::Recommendation)
    }

    /// End-of-run diagnostics block, one line per stage that carried a diagnostic
    pub fn diagnostics(&self) -> Vec<String> {
        self.stages
            .iter()
            .filter_map(|s| s.diagnostic.as_ref().map(|d| format!("{}: {}", s.stage, d)))
            .collect()
    }

    /// Rewrite artifact paths after files moved from `from` to `to`
    pub fn relocate(&mut self, from: &Path, to: &Path) {
        let move_path = |path: &mut PathBuf| {
            if let Ok(rest) = path.strip_prefix(from) {
                *path = to.join(rest);
            }
        };
        for entry in &mut self.stages {
            if let Some(path) = entry.artifact_path.as_mut() {
                move_path(path);
            }
            for path in entry.artifacts.values_mut() {
                move_path(path);
            }
        }
        self.output_dir = Some(to.to_path_buf());
    }

    /// Structured end-of-run summary
    ///
    /// A deliverable is present when its stage succeeded and the file exists.
    pub fn summary(&self) -> RunSummary {
        let deliverables: Vec<DeliverableStatus> = Deliverable::ALL
            .iter()
            .map(|&deliverable| {
                let path = self
                    .confirmed_artifact(deliverable)
                    .filter(|p| p.is_file())
                    .map(Path::to_path_buf);
                DeliverableStatus {
                    deliverable,
                    present: path.is_some(),
                    path,
                }
            })
            .collect();

        let report_present = deliverables
            .iter()
            .any(|d| d.deliverable == Deliverable::Report && d.present);

        RunSummary {
            run_id: self.run_id.clone(),
            state: self.state,
            run_succeeded: self.run_succeeded(),
            report_present,
            output_dir: self.output_dir.clone(),
            deliverables,
            diagnostics: self.diagnostics(),
        }
    }
}

/// Presence of one deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableStatus {
    pub deliverable: Deliverable,
    pub present: bool,
    pub path: Option<PathBuf>,
}

/// End-of-run summary; the sole success contract of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub state: RunState,
    /// Assessment, Interpretation and Recommendation succeeded
    pub run_succeeded: bool,
    /// Primary report deliverable exists; drives the exit code
    pub report_present: bool,
    pub output_dir: Option<PathBuf>,
    pub deliverables: Vec<DeliverableStatus>,
    pub diagnostics: Vec<String>,
}

impl RunSummary {
    pub fn deliverable(&self, deliverable: Deliverable) -> Option<&DeliverableStatus> {
        self.deliverables.iter().find(|d| d.deliverable == deliverable)
    }

    pub fn is_present(&self, deliverable: Deliverable) -> bool {
        self.deliverable(deliverable).map(|d| d.present).unwrap_or(false)
    }
}
