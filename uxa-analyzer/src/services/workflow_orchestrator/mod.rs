//! Analysis workflow orchestrator
//!
//! Coordinates one analysis run through every stage.
//!
//! # State Progression
//! INIT → ASSESSMENT → LOCALIZATION → SYNTHESIS → INTERPRETATION → RECOMMENDATION → REPORT → DONE
//!
//! # Failure Policy
//! - **ASSESSMENT** failure is fatal: the run is ABORTED before any other stage.
//! - Every later failure is recorded in the manifest and the run continues.
//! - **SYNTHESIS** is skipped unless localization produced at least one usable element.
//! - **REPORT** is always attempted once assessment succeeded, using only
//!   manifest-confirmed artifacts.
//!
//! Cancellation is checked between stages only. A cancelled run still
//! publishes whatever exists and cleans up its working directory.
//!
//! Each state is handled by a dedicated `phase_*` method in its own module.

use crate::error::PipelineError;
use crate::heatmap::SynthesisParams;
use crate::models::{
    AssessmentReport, ContextHints, FailurePolicy, NarrativeArtifact, RunManifest, RunSession,
    RunState, RunSummary, ScreenImage, Stage, StageOutcome, StateTransition,
};
use crate::services::localization_parser::ParsedLocalization;
use crate::services::prompts::{DEFAULT_INTERPRETATION_TEMPLATE, DEFAULT_RECOMMENDATIONS_TEMPLATE};
use crate::types::{AssessmentService, LocalizationService, NarrativeService, ReportRenderer};
use crate::utils::{RetryPolicy, RunWorkspace};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// Phase modules (internal implementation)
mod phase_assessment;
mod phase_localization;
mod phase_narrative;
mod phase_report;
mod phase_synthesis;

/// Manifest file written next to the deliverables
pub const MANIFEST_FILE: &str = "manifest.json";

/// External collaborators, built once by the caller
#[derive(Clone)]
pub struct PipelineServices {
    pub assessment: Arc<dyn AssessmentService>,
    pub localization: Arc<dyn LocalizationService>,
    pub narrative: Arc<dyn NarrativeService>,
    pub report: Arc<dyn ReportRenderer>,
}

/// Narrative instruction templates
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeTemplates {
    pub interpretation: String,
    pub recommendations: String,
}

impl Default for NarrativeTemplates {
    fn default() -> Self {
        Self {
            interpretation: DEFAULT_INTERPRETATION_TEMPLATE.to_string(),
            recommendations: DEFAULT_RECOMMENDATIONS_TEMPLATE.to_string(),
        }
    }
}

/// Run settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent of the private per-run directories
    pub work_dir: PathBuf,
    /// Stable location deliverables are published to
    pub output_dir: PathBuf,
    /// Keep the private directory after publishing
    pub keep_workdir: bool,
    /// Problem areas sent for localization (top K by severity)
    pub max_problem_areas: usize,
    pub retry: RetryPolicy,
    pub heatmap: SynthesisParams,
    pub templates: NarrativeTemplates,
}

impl PipelineSettings {
    pub fn new(work_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            work_dir,
            output_dir,
            keep_workdir: false,
            max_problem_areas: 30,
            retry: RetryPolicy::default(),
            heatmap: SynthesisParams::default(),
            templates: NarrativeTemplates::default(),
        }
    }
}

/// One run's input
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub image_path: PathBuf,
    pub hints: ContextHints,
}

/// Finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub manifest: RunManifest,
    pub summary: RunSummary,
    pub transitions: Vec<StateTransition>,
}

/// Mutable state of the run in progress
struct RunContext {
    session: RunSession,
    manifest: RunManifest,
    workspace: RunWorkspace,
    image: Arc<ScreenImage>,
    hints: ContextHints,
    assessment: Option<Arc<AssessmentReport>>,
    localization: Option<ParsedLocalization>,
    interpretation: Option<NarrativeArtifact>,
    recommendations: Option<NarrativeArtifact>,
}

/// Workflow orchestrator service
pub struct WorkflowOrchestrator {
    services: PipelineServices,
    settings: PipelineSettings,
}

impl WorkflowOrchestrator {
    pub fn new(services: PipelineServices, settings: PipelineSettings) -> Self {
        Self { services, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one complete analysis run
    ///
    /// Returns `Err` only for problems before the first stage (unusable input
    /// image, working directory not creatable). Stage failures are reported
    /// through the returned manifest.
    pub async fn execute_run(
        &self,
        request: RunRequest,
        cancel_token: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        let image = ScreenImage::load(&request.image_path).await?;

        let started_at = Utc::now();
        let workspace = RunWorkspace::create(&self.settings.work_dir, started_at)?;
        let run_id = workspace.run_id().to_string();

        info!(
            run_id = %run_id,
            image = %image.path.display(),
            width = image.width,
            height = image.height,
            "Analysis run started"
        );

        let manifest = RunManifest::new(run_id.clone(), started_at, image.record(), request.hints.clone());
        let mut ctx = RunContext {
            session: RunSession::new(run_id, started_at),
            manifest,
            workspace,
            image: Arc::new(image),
            hints: request.hints,
            assessment: None,
            localization: None,
            interpretation: None,
            recommendations: None,
        };

        for stage in Stage::PIPELINE {
            if cancel_token.is_cancelled() {
                warn!(run_id = %ctx.session.run_id, next_stage = %stage, "Run cancelled between stages");
                ctx.session.transition_to(RunState::Cancelled);
                break;
            }

            if let Some(reason) = self.skip_reason(&ctx, stage) {
                info!(run_id = %ctx.session.run_id, stage = %stage, reason = %reason, "Stage skipped");
                ctx.manifest.skip(stage, reason);
                continue;
            }

            let outcome = self.run_stage(&mut ctx, stage).await;

            if !outcome.succeeded && stage.policy() == FailurePolicy::Fatal {
                error!(
                    run_id = %ctx.session.run_id,
                    stage = %stage,
                    diagnostic = outcome.diagnostic.as_deref().unwrap_or(""),
                    "Fatal stage failure, aborting run"
                );
                ctx.session.transition_to(RunState::Aborted);
                break;
            }
        }

        match ctx.session.state {
            RunState::Cancelled => {
                for record in ctx.manifest.stages.iter_mut().filter(|r| !r.attempted && r.diagnostic.is_none()) {
                    record.diagnostic = Some("run cancelled".to_string());
                }
            }
            RunState::Aborted => {}
            _ => {
                ctx.session.transition_to(RunState::Done);
            }
        }

        Ok(self.finish(ctx))
    }

    /// Why `stage` should not run, given what earlier stages produced
    fn skip_reason(&self, ctx: &RunContext, stage: Stage) -> Option<String> {
        match stage {
            Stage::Synthesis => {
                if !ctx.manifest.succeeded(Stage::Localization) {
                    return Some("localization did not succeed".to_string());
                }
                let usable = ctx.localization.as_ref().map(|l| l.usable_count()).unwrap_or(0);
                if usable == 0 {
                    return Some("no usable localized elements".to_string());
                }
                None
            }
            _ => None,
        }
    }

    async fn run_stage(&self, ctx: &mut RunContext, stage: Stage) -> StageOutcome {
        ctx.session.transition_to(RunState::from(stage));
        info!(run_id = %ctx.session.run_id, stage = %stage, "Stage started");
        let start = Instant::now();

        let outcome = match stage {
            Stage::Assessment => self.phase_assessment(ctx).await,
            Stage::Localization => self.phase_localization(ctx).await,
            Stage::Synthesis => self.phase_synthesis(ctx).await,
            Stage::Interpretation => {
                self.phase_narrative(ctx, crate::models::NarrativeKind::Interpretation).await
            }
            Stage::Recommendation => {
                self.phase_narrative(ctx, crate::models::NarrativeKind::Recommendations).await
            }
            Stage::Report => self.phase_report(ctx).await,
        };

        let elapsed = start.elapsed();
        if outcome.succeeded {
            info!(
                run_id = %ctx.session.run_id,
                stage = %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                "Stage succeeded"
            );
        } else {
            warn!(
                run_id = %ctx.session.run_id,
                stage = %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                diagnostic = outcome.diagnostic.as_deref().unwrap_or(""),
                "Stage failed"
            );
        }

        ctx.manifest.record(stage, outcome.clone(), elapsed);
        outcome
    }

    /// Publish deliverables, clean up, build the summary
    fn finish(&self, mut ctx: RunContext) -> RunOutcome {
        ctx.manifest.state = ctx.session.state;
        ctx.manifest.finished_at = ctx.session.ended_at.or_else(|| Some(Utc::now()));

        let dest = self.settings.output_dir.join(ctx.workspace.run_id());
        let mut published = ctx.manifest.clone();
        published.relocate(ctx.workspace.dir(), &dest);

        let manifest_written = write_manifest(&published, &ctx.workspace.file(MANIFEST_FILE));

        let manifest = match manifest_written.and_then(|_| ctx.workspace.publish(&self.settings.output_dir)) {
            Ok(copied) => {
                info!(
                    run_id = %ctx.session.run_id,
                    dest = %copied.dir.display(),
                    "Run published"
                );
                if self.settings.keep_workdir {
                    info!(dir = %ctx.workspace.dir().display(), "Keeping run directory");
                } else {
                    ctx.workspace.cleanup();
                }
                published
            }
            Err(e) => {
                error!(
                    run_id = %ctx.session.run_id,
                    error = %e,
                    dir = %ctx.workspace.dir().display(),
                    "Publishing deliverables failed, keeping run directory"
                );
                if let Err(e) = write_manifest(&ctx.manifest, &ctx.workspace.file(MANIFEST_FILE)) {
                    warn!(run_id = %ctx.session.run_id, error = %e, "Writing local manifest failed");
                }
                ctx.manifest
            }
        };

        let summary = manifest.summary();
        info!(
            run_id = %summary.run_id,
            state = ?summary.state,
            run_succeeded = summary.run_succeeded,
            report_present = summary.report_present,
            "Analysis run finished"
        );

        RunOutcome {
            manifest,
            summary,
            transitions: ctx.session.transitions,
        }
    }
}

fn write_manifest(manifest: &RunManifest, path: &std::path::Path) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(manifest).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
