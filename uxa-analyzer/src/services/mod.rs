//! Service modules for the analysis pipeline
//!
//! - Inference clients (assessment, Gemini localization/narrative)
//! - Localization response repair
//! - Prompt construction
//! - Report assembly
//! - Workflow orchestration

pub mod assessment_client;
pub mod gemini_client;
pub mod localization_parser;
pub mod prompts;
pub mod report_assembler;
pub mod workflow_orchestrator;

pub use assessment_client::AssessmentClient;
pub use gemini_client::GeminiClient;
pub use localization_parser::{parse_localization_response, ParsedLocalization};
pub use report_assembler::{ConverterCommand, MarkdownReportRenderer};
pub use workflow_orchestrator::{PipelineServices, PipelineSettings, RunOutcome, RunRequest, WorkflowOrchestrator};

use crate::error::ServiceError;
use std::time::Duration;

const USER_AGENT: &str = concat!("uxa-analyzer/", env!("CARGO_PKG_VERSION"));

/// Connection and generation settings of one inference client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

impl ClientSettings {
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ServiceError> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }
}
