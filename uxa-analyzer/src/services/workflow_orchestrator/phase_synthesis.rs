//! Phase 3: SYNTHESIS
//!
//! Severity-weighted density overlay of the localized problem areas. Pure
//! computation, run on the blocking pool.

use super::{RunContext, WorkflowOrchestrator};
use crate::error::RenderError;
use crate::heatmap::{render_heatmap_file, HeatmapKind};
use crate::models::{Deliverable, LocalizedElement, StageOutcome};
use std::sync::Arc;
use tracing::info;

impl WorkflowOrchestrator {
    /// Phase 3: SYNTHESIS - render the heatmap from usable elements
    pub(super) async fn phase_synthesis(&self, ctx: &mut RunContext) -> StageOutcome {
        let Some(report) = ctx.assessment.clone() else {
            return StageOutcome::failure("no assessment available");
        };
        let elements: Vec<LocalizedElement> = ctx
            .localization
            .as_ref()
            .map(|l| l.usable().cloned().collect())
            .unwrap_or_default();

        let severities = report.severity_index();
        let params = self.settings.heatmap.clone();
        let image = Arc::clone(&ctx.image);
        let path = ctx.workspace.path(Deliverable::Heatmap);
        let out = path.clone();

        let rendered = tokio::task::spawn_blocking(move || {
            render_heatmap_file(&image, &elements, &severities, &params, &out)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))
        .and_then(|r| r);

        match rendered {
            Ok(heatmap) => {
                info!(
                    run_id = %ctx.session.run_id,
                    kind = ?heatmap.kind,
                    contributions = heatmap.contributions.len(),
                    "Heatmap written"
                );
                let outcome = StageOutcome::success().with_artifact(Deliverable::Heatmap, path);
                match (heatmap.kind, heatmap.note) {
                    (HeatmapKind::Overlay, _) | (_, None) => outcome,
                    (_, Some(note)) => outcome.with_diagnostic(format!("placeholder heatmap: {note}")),
                }
            }
            Err(e) => StageOutcome::failure(format!("heatmap synthesis failed: {e}")),
        }
    }
}
