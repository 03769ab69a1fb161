//! Analyzer configuration
//!
//! TOML bootstrap config with per-section defaults. Every section is
//! optional; a missing file yields built-in defaults. API keys resolve
//! ENV → TOML through [`uxa_common::config::resolve_secret`].
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [paths]
//! output_dir = "/srv/uxa/outputs"
//!
//! [assessment]
//! model = "gpt-4.1"
//!
//! [heatmap]
//! weighting = "linear"
//!
//! [report.converter]
//! program = "pandoc"
//! ```

use crate::heatmap::SynthesisParams;
use crate::services::prompts::{
    load_template, DEFAULT_ASSESSMENT_SYSTEM_PROMPT, DEFAULT_INTERPRETATION_TEMPLATE,
    DEFAULT_RECOMMENDATIONS_TEMPLATE,
};
use crate::services::workflow_orchestrator::NarrativeTemplates;
use crate::services::{
    AssessmentClient, ClientSettings, ConverterCommand, GeminiClient, MarkdownReportRenderer, PipelineServices,
    PipelineSettings,
};
use crate::utils::RetryPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use uxa_common::config::{CompiledDefaults, LoggingConfig};
use uxa_common::{Error, Result};

/// Environment variable holding the assessment service key
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the localization/narrative service key
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.5-pro-preview-03-25";

/// Top-level analyzer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub assessment: EndpointConfig,
    pub localization: EndpointConfig,
    pub narrative: EndpointConfig,
    pub retry: RetryPolicy,
    pub heatmap: SynthesisParams,
    pub report: ReportConfig,
    pub pipeline: PipelineConfig,
}

/// `[paths]` section; unset entries fall back to compiled defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// One inference endpoint (`[assessment]`, `[localization]`, `[narrative]`)
///
/// Unset fields take the per-endpoint defaults of [`EndpointDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    /// Assessment: system prompt file. Narrative: unused
    pub prompt_file: Option<PathBuf>,
    /// Narrative: interpretation template file
    pub interpretation_template: Option<PathBuf>,
    /// Narrative: recommendations template file
    pub recommendations_template: Option<PathBuf>,
}

/// Defaults applied to an [`EndpointConfig`]
struct EndpointDefaults {
    base_url: &'static str,
    model: &'static str,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
    timeout_secs: u64,
}

const ASSESSMENT_DEFAULTS: EndpointDefaults = EndpointDefaults {
    base_url: OPENAI_BASE_URL,
    model: "gpt-4.1",
    temperature: None,
    max_output_tokens: None,
    timeout_secs: 180,
};

const LOCALIZATION_DEFAULTS: EndpointDefaults = EndpointDefaults {
    base_url: GEMINI_BASE_URL,
    model: GEMINI_MODEL,
    temperature: Some(0.1),
    max_output_tokens: Some(8192),
    timeout_secs: 180,
};

const NARRATIVE_DEFAULTS: EndpointDefaults = EndpointDefaults {
    base_url: GEMINI_BASE_URL,
    model: GEMINI_MODEL,
    temperature: None,
    max_output_tokens: None,
    timeout_secs: 300,
};

impl EndpointConfig {
    fn client_settings(&self, defaults: &EndpointDefaults, api_key: String) -> ClientSettings {
        ClientSettings {
            base_url: self.endpoint.clone().unwrap_or_else(|| defaults.base_url.to_string()),
            model: self.model.clone().unwrap_or_else(|| defaults.model.to_string()),
            api_key,
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            temperature: self.temperature.or(defaults.temperature),
            max_output_tokens: self.max_output_tokens.or(defaults.max_output_tokens),
        }
    }
}

/// `[report]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// External converter producing the final document
    pub converter: Option<ConverterCommand>,
    /// Font for the placeholder heatmap; falls back to `[heatmap] font_path`
    pub font_path: Option<PathBuf>,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Problem areas sent for localization
    pub max_problem_areas: usize,
    pub keep_workdir: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_problem_areas: 30,
            keep_workdir: false,
        }
    }
}

impl AnalyzerConfig {
    /// Load from CLI path → `UXA_CONFIG` → per-user file → defaults
    pub fn load(cli_path: Option<&std::path::Path>) -> Result<(Self, Option<PathBuf>)> {
        uxa_common::config::load_config(cli_path, uxa_common::config::CONFIG_ENV_VAR)
    }

    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
    }

    /// Run settings with compiled defaults filling unset paths
    pub fn pipeline_settings(&self, defaults: &CompiledDefaults) -> Result<PipelineSettings> {
        let work_dir = self.paths.work_dir.clone().unwrap_or_else(|| defaults.work_dir.clone());
        let output_dir = self
            .paths
            .output_dir
            .clone()
            .unwrap_or_else(|| defaults.output_dir.clone());

        if self.pipeline.max_problem_areas == 0 {
            return Err(Error::Config("pipeline.max_problem_areas must be at least 1".to_string()));
        }
        if !self.heatmap.sigma_divisor.is_finite() || self.heatmap.sigma_divisor <= 0.0 {
            return Err(Error::Config("heatmap.sigma_divisor must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&self.heatmap.clip_percentile) {
            return Err(Error::Config("heatmap.clip_percentile must be within 0..=100".to_string()));
        }
        if !(0.0..=1.0).contains(&self.heatmap.overlay_alpha) {
            return Err(Error::Config("heatmap.overlay_alpha must be within 0..=1".to_string()));
        }

        let templates = NarrativeTemplates {
            interpretation: load_template(
                self.narrative.interpretation_template.as_deref(),
                DEFAULT_INTERPRETATION_TEMPLATE,
            )?,
            recommendations: load_template(
                self.narrative.recommendations_template.as_deref(),
                DEFAULT_RECOMMENDATIONS_TEMPLATE,
            )?,
        };

        let mut settings = PipelineSettings::new(work_dir, output_dir);
        settings.keep_workdir = self.pipeline.keep_workdir;
        settings.max_problem_areas = self.pipeline.max_problem_areas;
        settings.retry = self.retry.clone();
        settings.heatmap = self.heatmap.clone();
        settings.templates = templates;
        Ok(settings)
    }

    /// Build the production collaborators, resolving API keys
    pub fn build_services(&self) -> Result<PipelineServices> {
        let openai_key = uxa_common::config::resolve_secret(
            "Assessment API key",
            OPENAI_KEY_ENV,
            self.assessment.api_key.as_deref(),
        )?;
        let gemini_toml_key = self
            .localization
            .api_key
            .as_deref()
            .or(self.narrative.api_key.as_deref());
        let gemini_key = uxa_common::config::resolve_secret("Gemini API key", GEMINI_KEY_ENV, gemini_toml_key)?;

        let system_prompt = load_template(self.assessment.prompt_file.as_deref(), DEFAULT_ASSESSMENT_SYSTEM_PROMPT)?;

        let assessment = AssessmentClient::new(
            self.assessment.client_settings(&ASSESSMENT_DEFAULTS, openai_key),
            system_prompt,
        )
        .map_err(|e| Error::Config(format!("assessment client: {e}")))?;

        let localization = GeminiClient::new(
            self.localization
                .client_settings(&LOCALIZATION_DEFAULTS, gemini_key.clone()),
        )
        .map_err(|e| Error::Config(format!("localization client: {e}")))?;

        let narrative_key = self.narrative.api_key.clone().filter(|k| uxa_common::config::is_valid_key(k));
        let narrative = GeminiClient::new(
            self.narrative
                .client_settings(&NARRATIVE_DEFAULTS, narrative_key.unwrap_or(gemini_key)),
        )
        .map_err(|e| Error::Config(format!("narrative client: {e}")))?;

        let font_path = self.report.font_path.clone().or_else(|| self.heatmap.font_path.clone());
        let report = MarkdownReportRenderer::new(self.report.converter.clone(), font_path);

        Ok(PipelineServices {
            assessment: Arc::new(assessment),
            localization: Arc::new(localization),
            narrative: Arc::new(narrative),
            report: Arc::new(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::SeverityWeighting;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pipeline.max_problem_areas, 30);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.heatmap.weighting, SeverityWeighting::Squared);
        assert!(config.report.converter.is_none());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            [logging]
            level = "debug"

            [paths]
            output_dir = "/tmp/out"

            [localization]
            model = "gemini-test"
            temperature = 0.3

            [retry]
            max_retries = 3

            [heatmap]
            weighting = "linear"
            clip_percentile = 95.0

            [report.converter]
            program = "pandoc"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff_ms, 2000);
        assert_eq!(config.heatmap.weighting, SeverityWeighting::Linear);
        assert_eq!(config.heatmap.sigma_divisor, 4.0);

        let converter = config.report.converter.as_ref().unwrap();
        assert_eq!(converter.program, "pandoc");
        assert_eq!(converter.args, vec!["{input}", "-o", "{output}"]);

        let settings = config
            .localization
            .client_settings(&LOCALIZATION_DEFAULTS, "k".into());
        assert_eq!(settings.model, "gemini-test");
        assert_eq!(settings.temperature, Some(0.3));
        assert_eq!(settings.max_output_tokens, Some(8192));
        assert_eq!(settings.base_url, GEMINI_BASE_URL);
    }

    #[test]
    fn test_pipeline_settings_fill_paths() {
        let config = AnalyzerConfig::from_toml_str("[paths]\noutput_dir = \"/tmp/out\"").unwrap();
        let defaults = CompiledDefaults::for_current_platform();
        let settings = config.pipeline_settings(&defaults).unwrap();

        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.work_dir, defaults.work_dir);
        assert_eq!(settings.templates, NarrativeTemplates::default());
    }

    #[test]
    fn test_invalid_heatmap_parameters_rejected() {
        let config = AnalyzerConfig::from_toml_str("[heatmap]\noverlay_alpha = 1.5").unwrap();
        let defaults = CompiledDefaults::for_current_platform();
        assert!(config.pipeline_settings(&defaults).is_err());

        let config = AnalyzerConfig::from_toml_str("[pipeline]\nmax_problem_areas = 0").unwrap();
        assert!(config.pipeline_settings(&defaults).is_err());
    }

    #[test]
    fn test_unknown_weighting_is_parse_error() {
        assert!(AnalyzerConfig::from_toml_str("[heatmap]\nweighting = \"cubic\"").is_err());
    }

    #[test]
    fn test_assessment_defaults() {
        let settings = EndpointConfig::default().client_settings(&ASSESSMENT_DEFAULTS, "k".into());
        assert_eq!(settings.base_url, OPENAI_BASE_URL);
        assert_eq!(settings.model, "gpt-4.1");
        assert_eq!(settings.temperature, None);
    }
}
