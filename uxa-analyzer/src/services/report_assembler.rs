//! Report assembly
//!
//! Writes a Markdown report from the manifest-confirmed artifacts. When a
//! converter command is configured (e.g. pandoc) it is run to produce the
//! final document; if it is missing or fails, the Markdown file is delivered
//! instead and the degradation is noted.

use crate::error::RenderError;
use crate::heatmap::placeholder::{load_font, write_placeholder, PlaceholderKind};
use crate::models::{AssessmentReport, Deliverable, NarrativeArtifact};
use crate::types::{ReportFidelity, ReportInput, ReportOutput, ReportRenderer};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};


/// External document converter (`[report.converter]` config section)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConverterCommand {
    pub program: String,
    /// Arguments; `{input}` and `{output}` are substituted
    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,
    /// Extension of the rendered document
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
}

fn default_converter_args() -> Vec<String> {
    vec!["{input}".into(), "-o".into(), "{output}".into()]
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_converter_timeout() -> u64 {
    120
}

/// Markdown report renderer with optional conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownReportRenderer {
    converter: Option<ConverterCommand>,
    font_path: Option<PathBuf>,
}

impl MarkdownReportRenderer {
    pub fn new(converter: Option<ConverterCommand>, font_path: Option<PathBuf>) -> Self {
        Self { converter, font_path }
    }

    async fn convert(&self, converter: &ConverterCommand, source: &Path, out_dir: &Path) -> Result<PathBuf, RenderError> {
        let output = out_dir.join(format!("report.{}", converter.extension));
        let args: Vec<String> = converter
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &source.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
            })
            .collect();

        let run = tokio::process::Command::new(&converter.program)
            .args(&args)
            .current_dir(out_dir)
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(Duration::from_secs(converter.timeout_secs), run)
            .await
            .map_err(|_| RenderError::Converter(format!("timed out after {}s", converter.timeout_secs)))?
            .map_err(|e| RenderError::Converter(format!("cannot run '{}': {}", converter.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RenderError::Converter(format!(
                "'{}' exited with {}: {}",
                converter.program,
                result.status,
                stderr.trim()
            )));
        }
        if !output.is_file() {
            return Err(RenderError::Converter(format!(
                "'{}' produced no {}",
                converter.program,
                output.display()
            )));
        }
        Ok(output)
    }
}

#[async_trait::async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    async fn render(&self, input: &ReportInput<'_>, out_dir: &Path) -> Result<ReportOutput, RenderError> {
        let mut notes = Vec::new();

        let (heatmap, placeholder_path) = match input.heatmap {
            Some(path) => (path.to_path_buf(), None),
            None => {
                let path = out_dir.join(Deliverable::HeatmapPlaceholder.file_name());
                let font = self.font_path.as_deref().and_then(load_font);
                write_placeholder(
                    &path,
                    input.image.width,
                    input.image.height,
                    PlaceholderKind::NoData,
                    "Heatmap not available: no localized problem areas.",
                    font.as_ref(),
                )?;
                (path.clone(), Some(path))
            }
        };

        let markdown = build_markdown(input, &relative_to(&heatmap, out_dir), placeholder_path.is_some());
        let source_path = out_dir.join(Deliverable::ReportSource.file_name());
        tokio::fs::write(&source_path, markdown).await?;

        let (document_path, fidelity) = match &self.converter {
            None => (source_path.clone(), ReportFidelity::Source),
            Some(converter) => match self.convert(converter, &source_path, out_dir).await {
                Ok(rendered) => {
                    info!(path = %rendered.display(), "Report rendered");
                    (rendered, ReportFidelity::Rendered)
                }
                Err(e) => {
                    warn!(error = %e, "Report conversion failed, delivering Markdown");
                    notes.push(format!("final rendering failed, Markdown delivered: {e}"));
                    (source_path.clone(), ReportFidelity::Source)
                }
            },
        };

        Ok(ReportOutput {
            source_path,
            document_path,
            fidelity,
            placeholder_path,
            notes,
        })
    }
}

fn relative_to(path: &Path, dir: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Make text safe inside a Markdown table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Markdown report body
pub fn build_markdown(input: &ReportInput<'_>, heatmap_ref: &str, heatmap_is_placeholder: bool) -> String {
    let report = input.assessment;
    let mut md = String::new();

    let _ = writeln!(md, "# UI Usability Analysis Report\n");
    let _ = writeln!(md, "- **Run:** {}", input.run_id);
    let _ = writeln!(md, "- **Screenshot:** {}", input.image.path.display());
    let _ = writeln!(md, "- **Interface type (hint):** {}", input.hints.interface_type);
    let _ = writeln!(md, "- **User scenario (hint):** {}", input.hints.user_scenario);
    if let Some(at) = &report.meta_info.analysis_timestamp {
        let _ = writeln!(md, "- **Analyzed at:** {at}");
    }
    md.push('\n');

    write_overview(&mut md, report);
    write_scores(&mut md, report);
    write_findings(&mut md, report);

    let _ = writeln!(md, "## Problem Area Heatmap\n");
    if heatmap_is_placeholder {
        let _ = writeln!(md, "_No localized problem areas were available; a placeholder is shown._\n");
    }
    let _ = writeln!(md, "![Heatmap]({heatmap_ref})\n");

    if !input.localized.is_empty() {
        let _ = writeln!(md, "### Localized Areas\n");
        let _ = writeln!(md, "| ID | Element | Box [y_min, x_min, y_max, x_max] | Confidence |");
        let _ = writeln!(md, "|---|---|---|---|");
        for e in input.localized {
            let bbox = e
                .bounding_box
                .map(|b| {
                    let [a, b2, c, d] = b.to_array();
                    format!("[{a:.0}, {b2:.0}, {c:.0}, {d:.0}]")
                })
                .unwrap_or_else(|| "not located".to_string());
            let _ = writeln!(md, "| {} | {} | {} | {:.2} |", cell(&e.id), cell(&e.label), bbox, e.confidence);
        }
        md.push('\n');
    }

    write_interpretation(&mut md, input.interpretation);
    write_recommendations(&mut md, input.recommendations);

    if !input.diagnostics.is_empty() {
        let _ = writeln!(md, "## Diagnostics\n");
        for d in &input.diagnostics {
            let _ = writeln!(md, "- {}", d.replace('\n', " "));
        }
        md.push('\n');
    }

    md
}

fn write_overview(md: &mut String, report: &AssessmentReport) {
    let _ = writeln!(md, "## Overview\n");
    let _ = writeln!(
        md,
        "Overall complexity score: **{:.0} / 100**\n",
        report.meta_info.overall_complexity_score
    );
    let _ = writeln!(md, "Interface type: {}\n", report.meta_info.interface_type);
    if !report.meta_info.user_scenarios.is_empty() {
        let _ = writeln!(md, "User scenarios:\n");
        for s in &report.meta_info.user_scenarios {
            let _ = writeln!(md, "- {s}");
        }
        md.push('\n');
    }
}

fn write_scores(md: &mut String, report: &AssessmentReport) {
    let _ = writeln!(md, "## Complexity Scores\n");
    let _ = writeln!(md, "| Category | Score |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Overall | {:.0} |", report.complexity_scores.overall);
    for (category, block) in report.complexity_scores.blocks() {
        let _ = writeln!(md, "| {} | {:.0} |", category.title(), block.score);
    }
    md.push('\n');

    for (category, block) in report.complexity_scores.blocks() {
        let _ = writeln!(md, "### {} ({:.0})\n", category.title(), block.score);
        let _ = writeln!(md, "{}\n", block.reasoning.trim());
        let _ = writeln!(md, "| Component | Score | Rationale |");
        let _ = writeln!(md, "|---|---|---|");
        for (name, score) in &block.components {
            let why = block.component_reasonings.get(name).map(String::as_str).unwrap_or("");
            let _ = writeln!(md, "| {} | {:.0} | {} |", name, score, cell(why));
        }
        md.push('\n');
    }
}

fn write_findings(md: &mut String, report: &AssessmentReport) {
    let _ = writeln!(md, "## Key Findings\n");
    let ranked = report.ranked_problems();
    if ranked.is_empty() {
        let _ = writeln!(md, "No problem areas were identified.\n");
        return;
    }
    let dist = report.severity_distribution();
    let _ = writeln!(md, "{} problem areas identified:\n", dist.total());
    let _ = writeln!(md, "- Critical (80-100): {}", dist.critical);
    let _ = writeln!(md, "- Medium (50-79): {}", dist.medium);
    let _ = writeln!(md, "- Low (1-49): {}\n", dist.low);
    let _ = writeln!(md, "| ID | Severity | Category | Location | Description |");
    let _ = writeln!(md, "|---|---|---|---|---|");
    for p in &ranked {
        let _ = writeln!(
            md,
            "| {} | {} | {} / {} | {} | {} |",
            cell(&p.id),
            p.severity,
            cell(&p.category),
            cell(&p.subcategory),
            cell(&p.location),
            cell(&p.description)
        );
    }
    md.push('\n');
    for p in ranked.iter().filter(|p| !p.rationale.trim().is_empty()) {
        let _ = writeln!(md, "- **{}:** {}", p.id, p.rationale.trim());
    }
    md.push('\n');
}

fn write_interpretation(md: &mut String, artifact: Option<&NarrativeArtifact>) {
    let _ = writeln!(md, "## Strategic Interpretation\n");
    let Some(artifact) = artifact else {
        let _ = writeln!(md, "_Not available for this run._\n");
        return;
    };
    match artifact.interpretation() {
        Some(view) => {
            for (title, text) in view.sections() {
                let _ = writeln!(md, "### {title}\n\n{}\n", text.trim());
            }
        }
        None => {
            let _ = writeln!(md, "{}\n", artifact.text);
        }
    }
}

fn write_recommendations(md: &mut String, artifact: Option<&NarrativeArtifact>) {
    let _ = writeln!(md, "## Strategic Recommendations\n");
    let Some(artifact) = artifact else {
        let _ = writeln!(md, "_Not available for this run._\n");
        return;
    };
    match artifact.recommendations() {
        Some(recs) => {
            for (i, r) in recs.iter().enumerate() {
                let _ = writeln!(md, "### {}. {}\n", i + 1, r.title.trim());
                for (label, text) in [
                    ("Problem", &r.problem_statement),
                    ("Solution", &r.solution_description),
                    ("Business constraints", &r.business_constraints),
                    ("Expected impact", &r.expected_impact),
                    ("Cross-domain example", &r.cross_domain_example),
                    ("Testing approach", &r.testing_approach),
                ] {
                    if !text.trim().is_empty() {
                        let _ = writeln!(md, "- **{label}:** {}", text.trim());
                    }
                }
                md.push('\n');
            }
        }
        None => {
            let _ = writeln!(md, "{}\n", artifact.text);
        }
    }
}
