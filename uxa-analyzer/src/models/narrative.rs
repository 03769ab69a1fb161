//! Narrative artifacts (strategic interpretation and recommendations)

use crate::models::manifest::{Deliverable, Stage};
use crate::utils::json_extract::{extract_json, strip_code_fence};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which narrative is being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    Interpretation,
    Recommendations,
}

impl NarrativeKind {
    pub fn stage(self) -> Stage {
        match self {
            NarrativeKind::Interpretation => Stage::Interpretation,
            NarrativeKind::Recommendations => Stage::Recommendation,
        }
    }

    pub fn deliverable(self) -> Deliverable {
        match self {
            NarrativeKind::Interpretation => Deliverable::Interpretation,
            NarrativeKind::Recommendations => Deliverable::Recommendations,
        }
    }
}

impl fmt::Display for NarrativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeKind::Interpretation => f.write_str("interpretation"),
            NarrativeKind::Recommendations => f.write_str("recommendations"),
        }
    }
}

/// `strategicInterpretation` sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategicInterpretation {
    pub cognitive_ecosystem: String,
    pub business_user_tension: String,
    pub attention_architecture: String,
    pub perceptual_crossroads: String,
    pub hidden_patterns: String,
}

impl StrategicInterpretation {
    /// Non-empty sections with display titles
    pub fn sections(&self) -> Vec<(&'static str, &str)> {
        [
            ("Cognitive Ecosystem", self.cognitive_ecosystem.as_str()),
            ("Business/User Tension", self.business_user_tension.as_str()),
            ("Attention Architecture", self.attention_architecture.as_str()),
            ("Perceptual Crossroads", self.perceptual_crossroads.as_str()),
            ("Hidden Patterns", self.hidden_patterns.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
    }
}

/// One entry of `strategicRecommendations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategicRecommendation {
    pub title: String,
    pub problem_statement: String,
    pub solution_description: String,
    pub business_constraints: String,
    pub expected_impact: String,
    pub cross_domain_example: String,
    pub testing_approach: String,
}

/// Narrative service output, unwrapped and lightly parsed
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeArtifact {
    pub kind: NarrativeKind,
    /// Response text with any surrounding code fence removed
    pub text: String,
    /// JSON payload when the text contains one
    pub json: Option<Value>,
}

impl NarrativeArtifact {
    pub fn from_response(kind: NarrativeKind, response: &str) -> Self {
        let text = strip_code_fence(response).trim().to_string();
        let json = extract_json(&text).map(|(value, _)| value);
        Self { kind, text, json }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Typed interpretation view when the payload has the known shape
    pub fn interpretation(&self) -> Option<StrategicInterpretation> {
        let section = self.json.as_ref()?.get("strategicInterpretation")?;
        let parsed: StrategicInterpretation = serde_json::from_value(section.clone()).ok()?;
        if parsed.sections().is_empty() {
            None
        } else {
            Some(parsed)
        }
    }

    /// Typed recommendation list when the payload has the known shape
    pub fn recommendations(&self) -> Option<Vec<StrategicRecommendation>> {
        let list = self.json.as_ref()?.get("strategicRecommendations")?;
        let parsed: Vec<StrategicRecommendation> = serde_json::from_value(list.clone()).ok()?;
        if parsed.is_empty() {
            None
        } else {
            Some(parsed)
        }
    }
}
