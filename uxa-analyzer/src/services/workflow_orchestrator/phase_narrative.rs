//! Phases 4 and 5: INTERPRETATION and RECOMMENDATION
//!
//! Both narratives read only the validated assessment; neither depends on the
//! other, so a failure of one never blocks the next.

use super::{RunContext, WorkflowOrchestrator};
use crate::error::PipelineError;
use crate::models::{NarrativeArtifact, NarrativeKind, StageOutcome};
use crate::services::prompts::render_narrative_prompt;
use crate::utils::retry_external_call;
use std::sync::Arc;

impl WorkflowOrchestrator {
    /// Generate one narrative from the assessment JSON
    pub(super) async fn phase_narrative(&self, ctx: &mut RunContext, kind: NarrativeKind) -> StageOutcome {
        let Some(report) = ctx.assessment.clone() else {
            return StageOutcome::failure("no assessment available");
        };

        let analysis = match serde_json::to_string_pretty(report.as_ref()) {
            Ok(json) => json,
            Err(e) => return StageOutcome::failure(format!("cannot serialize assessment: {e}")),
        };
        let template = match kind {
            NarrativeKind::Interpretation => &self.settings.templates.interpretation,
            NarrativeKind::Recommendations => &self.settings.templates.recommendations,
        };
        let prompt = render_narrative_prompt(template, &analysis);

        let service = Arc::clone(&self.services.narrative);
        let response = retry_external_call(kind.stage().name(), &self.settings.retry, || {
            service.generate(kind, &prompt)
        })
        .await;

        let text = match response {
            Ok(text) => text,
            Err(e) => return StageOutcome::failure(PipelineError::external(kind.stage(), e).to_string()),
        };

        let artifact = NarrativeArtifact::from_response(kind, &text);
        if artifact.is_empty() {
            return StageOutcome::failure(format!("{kind} response was empty"));
        }

        let path = ctx.workspace.path(kind.deliverable());
        if let Err(e) = std::fs::write(&path, &artifact.text) {
            return StageOutcome::failure(format!("cannot write {}: {}", path.display(), e));
        }

        tracing::info!(
            run_id = %ctx.session.run_id,
            kind = %kind,
            chars = artifact.text.len(),
            structured = artifact.json.is_some(),
            "Narrative generated"
        );

        let mut outcome = StageOutcome::success().with_artifact(kind.deliverable(), path);
        if artifact.json.is_none() {
            outcome = outcome.with_diagnostic(format!("{kind} response is not JSON, kept as text"));
        }

        match kind {
            NarrativeKind::Interpretation => ctx.interpretation = Some(artifact),
            NarrativeKind::Recommendations => ctx.recommendations = Some(artifact),
        }
        outcome
    }
}
