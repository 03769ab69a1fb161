//! Error types for uxa-analyzer
//!
//! - `ServiceError`: one external inference call failed
//! - `PipelineError`: run-level taxonomy (fatal input, stage schema, external call, render)
//! - `RenderError`: heatmap or report rendering failed

use crate::models::assessment::SchemaViolation;
use crate::models::manifest::Stage;
use thiserror::Error;

/// External inference call errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication rejected ({0})")]
    Auth(u16),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Map a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = truncate(body, 500);
        match status {
            401 | 403 => ServiceError::Auth(status),
            429 => ServiceError::RateLimited(message),
            _ => ServiceError::Api(status, message),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Network(_) | ServiceError::Timeout(_) | ServiceError::RateLimited(_) => true,
            ServiceError::Api(status, _) => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout(e.to_string())
        } else if e.is_decode() {
            ServiceError::Parse(e.to_string())
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

/// Rendering errors (heatmap, placeholder, report)
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Density field too large: {width}x{height} exceeds {limit} pixels")]
    TooLarge { width: u32, height: u32, limit: u64 },

    #[error("Report converter failed: {0}")]
    Converter(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Run-level errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input image missing or unreadable; raised before any stage runs
    #[error("Input image unusable: {0}")]
    FatalInput(String),

    /// Service output does not have the required structure
    #[error("{stage} response violates required structure: {detail}")]
    StageSchema { stage: Stage, detail: String },

    /// External call failed after retries
    #[error("{stage} external call failed: {source}")]
    ExternalCall {
        stage: Stage,
        #[source]
        source: ServiceError,
    },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Run directory could not be created or written
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Common error: {0}")]
    Common(#[from] uxa_common::Error),
}

impl PipelineError {
    pub fn schema(stage: Stage, violation: SchemaViolation) -> Self {
        PipelineError::StageSchema {
            stage,
            detail: violation.to_string(),
        }
    }

    pub fn external(stage: Stage, source: ServiceError) -> Self {
        PipelineError::ExternalCall { stage, source }
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_and_retryability() {
        assert!(matches!(ServiceError::from_status(401, ""), ServiceError::Auth(401)));
        assert!(ServiceError::from_status(429, "slow down").is_retryable());
        assert!(ServiceError::from_status(503, "").is_retryable());
        assert!(!ServiceError::from_status(400, "bad").is_retryable());
        assert!(!ServiceError::Parse("x".into()).is_retryable());
    }

    #[test]
    fn test_external_call_display_names_stage() {
        let err = PipelineError::external(Stage::Interpretation, ServiceError::Network("reset".into()));
        assert_eq!(
            err.to_string(),
            "interpretation external call failed: Network error: reset"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
