//! Phase 2: LOCALIZATION
//!
//! Bounding boxes for the top-K problem areas by severity. Never fatal; an
//! unusable response is a successful stage with zero elements.

use super::{RunContext, WorkflowOrchestrator};
use crate::error::PipelineError;
use crate::models::{Deliverable, Stage, StageOutcome};
use crate::services::localization_parser::{parse_localization_response, ParsedLocalization};
use crate::services::prompts::localization_prompt;
use crate::utils::retry_external_call;
use std::sync::Arc;
use tracing::{info, warn};

impl WorkflowOrchestrator {
    /// Phase 2: LOCALIZATION - locate ranked problem areas on the screenshot
    ///
    /// Persists the raw response text and the parsed element list.
    pub(super) async fn phase_localization(&self, ctx: &mut RunContext) -> StageOutcome {
        let Some(report) = ctx.assessment.clone() else {
            return StageOutcome::failure("no assessment available");
        };

        let parsed_path = ctx.workspace.path(Deliverable::LocalizationParsed);
        let top = report.top_problems(self.settings.max_problem_areas);

        if top.is_empty() {
            let empty = ParsedLocalization::empty(None);
            return match write_parsed(&empty, &parsed_path) {
                Ok(()) => {
                    ctx.localization = Some(empty);
                    StageOutcome::success()
                        .with_artifact(Deliverable::LocalizationParsed, parsed_path)
                        .with_diagnostic("no problem areas to localize")
                }
                Err(e) => StageOutcome::failure(format!("cannot write {}: {}", parsed_path.display(), e)),
            };
        }

        let prompt = localization_prompt(&top);
        let image = Arc::clone(&ctx.image);
        let service = Arc::clone(&self.services.localization);

        let response = retry_external_call("localization", &self.settings.retry, || {
            service.localize(&image, &prompt)
        })
        .await;

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                return StageOutcome::failure(PipelineError::external(Stage::Localization, e).to_string())
            }
        };

        let mut outcome = StageOutcome::success();

        let raw_path = ctx.workspace.path(Deliverable::LocalizationRaw);
        match std::fs::write(&raw_path, &raw) {
            Ok(()) => outcome = outcome.with_artifact(Deliverable::LocalizationRaw, raw_path),
            Err(e) => warn!(error = %e, "Cannot persist raw localization response"),
        }

        let parsed = parse_localization_response(&raw);

        for element in &parsed.elements {
            if !report.contains_problem(&element.id) {
                warn!(
                    run_id = %ctx.session.run_id,
                    id = %element.id,
                    "Localized element references unknown problem area"
                );
            }
        }

        info!(
            run_id = %ctx.session.run_id,
            requested = top.len(),
            elements = parsed.elements.len(),
            usable = parsed.usable_count(),
            dropped = parsed.dropped.len(),
            "Localization parsed"
        );

        if let Err(e) = write_parsed(&parsed, &parsed_path) {
            return StageOutcome::failure(format!("cannot write {}: {}", parsed_path.display(), e));
        }
        outcome = outcome.with_artifact(Deliverable::LocalizationParsed, parsed_path);

        if let Some(note) = parsed.repair_note() {
            outcome = outcome.with_diagnostic(format!("response repaired: {note}"));
        }

        ctx.localization = Some(parsed);
        outcome
    }
}

fn write_parsed(parsed: &ParsedLocalization, path: &std::path::Path) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(&parsed.to_document()).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
