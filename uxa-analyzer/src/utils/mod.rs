//! Utility modules for uxa-analyzer

pub mod json_extract;
pub mod retry;
pub mod run_workspace;

pub use json_extract::{extract_json, ExtractionStrategy};
pub use retry::{retry_external_call, RetryPolicy};
pub use run_workspace::{PublishedRun, RunWorkspace};
