//! Scripted in-process collaborators
//!
//! Each fake answers from a queue of replies; once the queue is drained the
//! last reply repeats. Calls are counted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::path::Path;
use uxa_analyzer::error::{RenderError, ServiceError};
use uxa_analyzer::models::{ContextHints, NarrativeKind, ScreenImage};
use uxa_analyzer::types::{
    AssessmentService, LocalizationService, NarrativeService, ReportInput, ReportOutput, ReportRenderer,
};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    NetworkError,
    AuthError,
    ServerError,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    fn into_result(self) -> Result<String, ServiceError> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::NetworkError => Err(ServiceError::Network("connection reset".into())),
            Reply::AuthError => Err(ServiceError::Auth(401)),
            Reply::ServerError => Err(ServiceError::Api(503, "unavailable".into())),
        }
    }
}

/// Reply queue with a call counter
#[derive(Debug)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        };
        reply.into_result()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug)]
pub struct FakeAssessment {
    script: Script,
    last_hints: Mutex<Option<ContextHints>>,
}

impl FakeAssessment {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Script::new(replies),
            last_hints: Mutex::new(None),
        }
    }

    pub fn answering(json: &serde_json::Value) -> Self {
        Self::new(vec![Reply::text(json.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    pub fn last_hints(&self) -> Option<ContextHints> {
        self.last_hints.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AssessmentService for FakeAssessment {
    fn name(&self) -> &str {
        "fake-assessment"
    }

    async fn assess(&self, _image: &ScreenImage, hints: &ContextHints) -> Result<String, ServiceError> {
        *self.last_hints.lock().unwrap() = Some(hints.clone());
        self.script.next()
    }
}

// ============================================================================
// Localization
// ============================================================================

#[derive(Debug)]
pub struct FakeLocalization {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl FakeLocalization {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Script::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: impl Into<String>) -> Self {
        Self::new(vec![Reply::text(text)])
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LocalizationService for FakeLocalization {
    fn name(&self) -> &str {
        "fake-localization"
    }

    async fn localize(&self, _image: &ScreenImage, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script.next()
    }
}

// ============================================================================
// Narrative
// ============================================================================

/// Separate scripts for the two narrative kinds
#[derive(Debug)]
pub struct FakeNarrative {
    interpretation: Script,
    recommendations: Script,
}

impl FakeNarrative {
    pub fn new(interpretation: Vec<Reply>, recommendations: Vec<Reply>) -> Self {
        Self {
            interpretation: Script::new(interpretation),
            recommendations: Script::new(recommendations),
        }
    }

    /// Both kinds answer with well-formed JSON
    pub fn well_formed() -> Self {
        Self::new(
            vec![Reply::text(
                r#"{"strategicInterpretation": {"cognitiveEcosystem": "Dense form", "hiddenPatterns": "Z-pattern scan"}}"#,
            )],
            vec![Reply::text(
                r#"```json
{"strategicRecommendations": [{"title": "Group related fields", "problemStatement": "Scattered inputs", "expectedImpact": "Faster completion"}]}
```"#,
            )],
        )
    }

    pub fn calls(&self, kind: NarrativeKind) -> usize {
        match kind {
            NarrativeKind::Interpretation => self.interpretation.calls(),
            NarrativeKind::Recommendations => self.recommendations.calls(),
        }
    }
}

#[async_trait::async_trait]
impl NarrativeService for FakeNarrative {
    fn name(&self) -> &str {
        "fake-narrative"
    }

    async fn generate(&self, kind: NarrativeKind, _prompt: &str) -> Result<String, ServiceError> {
        match kind {
            NarrativeKind::Interpretation => self.interpretation.next(),
            NarrativeKind::Recommendations => self.recommendations.next(),
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Renderer that always fails, counting calls
#[derive(Debug, Default)]
pub struct FailingRenderer {
    calls: AtomicUsize,
}

impl FailingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReportRenderer for FailingRenderer {
    async fn render(&self, _input: &ReportInput<'_>, _out_dir: &Path) -> Result<ReportOutput, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RenderError::Converter("renderer unavailable".into()))
    }
}
