//! Phase 6: REPORT
//!
//! Assembles the report from manifest-confirmed artifacts only. Anything a
//! stage did not confirm is treated as absent, never read from disk.

use super::{RunContext, WorkflowOrchestrator};
use crate::models::{Deliverable, LocalizedElement, Stage, StageOutcome};
use crate::types::{ReportFidelity, ReportInput};

impl WorkflowOrchestrator {
    /// Phase 6: REPORT - render the final document
    pub(super) async fn phase_report(&self, ctx: &mut RunContext) -> StageOutcome {
        let Some(report) = ctx.assessment.clone() else {
            return StageOutcome::failure("no assessment available");
        };

        let manifest = &ctx.manifest;
        let localized: &[LocalizedElement] = match (&ctx.localization, manifest.succeeded(Stage::Localization)) {
            (Some(parsed), true) => parsed.elements.as_slice(),
            _ => &[],
        };
        let interpretation = ctx
            .interpretation
            .as_ref()
            .filter(|_| manifest.succeeded(Stage::Interpretation));
        let recommendations = ctx
            .recommendations
            .as_ref()
            .filter(|_| manifest.succeeded(Stage::Recommendation));

        let input = ReportInput {
            run_id: &ctx.session.run_id,
            image: &ctx.image,
            hints: &ctx.hints,
            assessment: &report,
            localized,
            heatmap: manifest.confirmed_artifact(Deliverable::Heatmap),
            interpretation,
            recommendations,
            diagnostics: manifest.diagnostics(),
        };

        let output = match self.services.report.render(&input, ctx.workspace.dir()).await {
            Ok(output) => output,
            Err(e) => return StageOutcome::failure(format!("report assembly failed: {e}")),
        };

        tracing::info!(
            run_id = %ctx.session.run_id,
            document = %output.document_path.display(),
            fidelity = ?output.fidelity,
            "Report assembled"
        );

        let mut outcome = StageOutcome::success()
            .with_artifact(Deliverable::ReportSource, output.source_path)
            .with_artifact(Deliverable::Report, output.document_path);
        if let Some(placeholder) = output.placeholder_path {
            outcome = outcome.with_artifact(Deliverable::HeatmapPlaceholder, placeholder);
        }
        let mut notes = output.notes;
        if output.fidelity == ReportFidelity::Source && notes.is_empty() {
            notes.push("report delivered as source document".to_string());
        }
        if !notes.is_empty() {
            outcome = outcome.with_diagnostic(notes.join("; "));
        }
        outcome
    }
}
