//! Phase 1: ASSESSMENT
//!
//! Structured usability assessment of the screenshot. The only fatal stage:
//! a failed call or a schema violation aborts the run.

use super::{RunContext, WorkflowOrchestrator};
use crate::error::PipelineError;
use crate::models::{AssessmentReport, Deliverable, Stage, StageOutcome};
use crate::utils::retry_external_call;
use std::sync::Arc;

impl WorkflowOrchestrator {
    /// Phase 1: ASSESSMENT - call the assessment service and validate its report
    pub(super) async fn phase_assessment(&self, ctx: &mut RunContext) -> StageOutcome {
        let image = Arc::clone(&ctx.image);
        let hints = ctx.hints.clone();
        let service = Arc::clone(&self.services.assessment);

        let response = retry_external_call("assessment", &self.settings.retry, || {
            service.assess(&image, &hints)
        })
        .await;

        let text = match response {
            Ok(text) => text,
            Err(e) => return StageOutcome::failure(PipelineError::external(Stage::Assessment, e).to_string()),
        };

        let report = match AssessmentReport::from_json(&text) {
            Ok(report) => report,
            Err(violation) => {
                return StageOutcome::failure(PipelineError::schema(Stage::Assessment, violation).to_string())
            }
        };

        tracing::info!(
            run_id = %ctx.session.run_id,
            problem_areas = report.problem_areas.len(),
            overall = report.complexity_scores.overall,
            "Assessment validated"
        );

        let path = ctx.workspace.path(Deliverable::AssessmentJson);
        let written = serde_json::to_vec_pretty(&report)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json));
        if let Err(e) = written {
            return StageOutcome::failure(format!("cannot write {}: {}", path.display(), e));
        }

        ctx.assessment = Some(Arc::new(report));
        StageOutcome::success().with_artifact(Deliverable::AssessmentJson, path)
    }
}
