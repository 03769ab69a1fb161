//! Structured usability assessment
//!
//! The assessment service returns one `AssessmentReport` per screenshot:
//! an overall score, six category blocks with named sub-scores, and a list of
//! problem areas. Wire format is camelCase JSON.
//!
//! Every score lies in [1, 100]. A report is only constructed through
//! [`AssessmentReport::from_json`] / [`AssessmentReport::from_value`], which
//! validate that invariant, so downstream stages never see an invalid report.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Lowest valid score
pub const MIN_SCORE: f64 = 1.0;
/// Highest valid score
pub const MAX_SCORE: f64 = 100.0;

/// Assessment schema violations
#[derive(Debug, Error, PartialEq)]
pub enum SchemaViolation {
    /// JSON could not be decoded into the report shape (missing or mistyped field)
    #[error("Malformed assessment: {0}")]
    Malformed(String),

    /// A score fell outside [1, 100]
    #[error("Score out of range at {path}: {value}")]
    ScoreOutOfRange { path: String, value: f64 },

    /// A required sub-score is absent from a category block
    #[error("Missing sub-score '{component}' in {category}")]
    MissingComponent {
        category: &'static str,
        component: &'static str,
    },

    /// Problem area id is blank
    #[error("Problem area at index {0} has an empty id")]
    EmptyId(usize),

    /// Two problem areas share an id
    #[error("Duplicate problem area id: {0}")]
    DuplicateId(String),

    /// Severity outside 1..=100
    #[error("Problem area {id} has severity {severity} outside 1..=100")]
    SeverityOutOfRange { id: String, severity: u32 },
}

/// The six scored usability categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    StructuralVisualOrganization,
    VisualPerceptualComplexity,
    TypographicComplexity,
    InformationLoad,
    CognitiveLoad,
    OperationalComplexity,
}

impl Category {
    /// All categories in report order
    pub const ALL: [Category; 6] = [
        Category::StructuralVisualOrganization,
        Category::VisualPerceptualComplexity,
        Category::TypographicComplexity,
        Category::InformationLoad,
        Category::CognitiveLoad,
        Category::OperationalComplexity,
    ];

    /// Wire key of this category inside `complexityScores`
    pub fn key(self) -> &'static str {
        match self {
            Category::StructuralVisualOrganization => "structuralVisualOrganization",
            Category::VisualPerceptualComplexity => "visualPerceptualComplexity",
            Category::TypographicComplexity => "typographicComplexity",
            Category::InformationLoad => "informationLoad",
            Category::CognitiveLoad => "cognitiveLoad",
            Category::OperationalComplexity => "operationalComplexity",
        }
    }

    /// Human-readable title
    pub fn title(self) -> &'static str {
        match self {
            Category::StructuralVisualOrganization => "Structural & Visual Organization",
            Category::VisualPerceptualComplexity => "Visual-Perceptual Complexity",
            Category::TypographicComplexity => "Typographic Complexity",
            Category::InformationLoad => "Information Load",
            Category::CognitiveLoad => "Cognitive Load",
            Category::OperationalComplexity => "Operational Complexity",
        }
    }

    /// Sub-scores every block of this category must carry
    pub fn required_components(self) -> &'static [&'static str] {
        match self {
            Category::StructuralVisualOrganization => &[
                "gridStructure",
                "elementDensity",
                "whiteSpace",
                "colorEntropy",
                "visualSymmetry",
                "statisticalAnalysis",
            ],
            Category::VisualPerceptualComplexity => &[
                "edgeDensity",
                "colorComplexity",
                "visualSaliency",
                "textureComplexity",
                "perceptualContrast",
            ],
            Category::TypographicComplexity => &[
                "fontDiversity",
                "textScaling",
                "textDensity",
                "textAlignment",
                "textHierarchy",
                "readability",
            ],
            Category::InformationLoad => &[
                "informationDensity",
                "informationStructure",
                "informationNoise",
                "informationRelevance",
                "informationProcessingComplexity",
            ],
            Category::CognitiveLoad => &[
                "intrinsicLoad",
                "extrinsicLoad",
                "germaneCognitiveLoad",
                "workingMemoryLoad",
            ],
            Category::OperationalComplexity => &[
                "decisionComplexity",
                "physicalComplexity",
                "operationalSequence",
                "interactionEfficiency",
                "feedbackVisibility",
            ],
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    /// Interface type as understood by the assessor
    pub interface_type: String,
    /// Typical user scenarios
    pub user_scenarios: Vec<String>,
    /// Overall complexity score (1-100)
    pub overall_complexity_score: f64,
    /// Analysis timestamp (RFC 3339); filled in when the service omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_timestamp: Option<String>,
}

/// One scored category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBlock {
    /// Category score (1-100)
    pub score: f64,
    /// Named sub-scores (1-100)
    pub components: BTreeMap<String, f64>,
    /// Rationale for the category score
    pub reasoning: String,
    /// Optional rationale per sub-score
    #[serde(default)]
    pub component_reasonings: BTreeMap<String, String>,
}

/// Overall score plus the six category blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityScores {
    pub overall: f64,
    pub structural_visual_organization: CategoryBlock,
    pub visual_perceptual_complexity: CategoryBlock,
    pub typographic_complexity: CategoryBlock,
    pub information_load: CategoryBlock,
    pub cognitive_load: CategoryBlock,
    pub operational_complexity: CategoryBlock,
}

impl ComplexityScores {
    /// Block for a category
    pub fn block(&self, category: Category) -> &CategoryBlock {
        match category {
            Category::StructuralVisualOrganization => &self.structural_visual_organization,
            Category::VisualPerceptualComplexity => &self.visual_perceptual_complexity,
            Category::TypographicComplexity => &self.typographic_complexity,
            Category::InformationLoad => &self.information_load,
            Category::CognitiveLoad => &self.cognitive_load,
            Category::OperationalComplexity => &self.operational_complexity,
        }
    }

    /// Blocks in report order
    pub fn blocks(&self) -> impl Iterator<Item = (Category, &CategoryBlock)> {
        Category::ALL.into_iter().map(move |c| (c, self.block(c)))
    }
}

/// One identified usability issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemArea {
    /// Identifier, unique within the report (numbers are normalized to strings)
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    /// Free-text location hint
    pub location: String,
    /// Criticality (1-100)
    pub severity: u32,
    /// HCI rationale
    #[serde(rename = "scientificReasoning")]
    pub rationale: String,
}

/// Structured usability scoring and findings for one screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub meta_info: MetaInfo,
    pub complexity_scores: ComplexityScores,
    pub problem_areas: Vec<ProblemArea>,
}

impl AssessmentReport {
    /// Decode and validate a report from service JSON text
    pub fn from_json(text: &str) -> Result<Self, SchemaViolation> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SchemaViolation::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode and validate a report from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, SchemaViolation> {
        let mut report: AssessmentReport =
            serde_json::from_value(value).map_err(|e| SchemaViolation::Malformed(e.to_string()))?;

        if report.meta_info.analysis_timestamp.is_none() {
            report.meta_info.analysis_timestamp = Some(chrono::Utc::now().to_rfc3339());
        }

        report.validate()?;
        Ok(report)
    }

    /// Check score ranges, required sub-scores and problem area ids
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        for (path, value) in self.scores() {
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(SchemaViolation::ScoreOutOfRange { path, value });
            }
        }

        for (category, block) in self.complexity_scores.blocks() {
            for component in category.required_components() {
                if !block.components.contains_key(*component) {
                    return Err(SchemaViolation::MissingComponent {
                        category: category.key(),
                        component,
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for (index, area) in self.problem_areas.iter().enumerate() {
            if area.id.trim().is_empty() {
                return Err(SchemaViolation::EmptyId(index));
            }
            if !seen.insert(area.id.as_str()) {
                return Err(SchemaViolation::DuplicateId(area.id.clone()));
            }
            if !(1..=100).contains(&area.severity) {
                return Err(SchemaViolation::SeverityOutOfRange {
                    id: area.id.clone(),
                    severity: area.severity,
                });
            }
        }

        Ok(())
    }

    /// Every numeric score in the report with a dotted path for diagnostics
    pub fn scores(&self) -> Vec<(String, f64)> {
        let mut scores = vec![
            (
                "metaInfo.overallComplexityScore".to_string(),
                self.meta_info.overall_complexity_score,
            ),
            (
                "complexityScores.overall".to_string(),
                self.complexity_scores.overall,
            ),
        ];

        for (category, block) in self.complexity_scores.blocks() {
            scores.push((format!("complexityScores.{}.score", category.key()), block.score));
            for (name, value) in &block.components {
                scores.push((
                    format!("complexityScores.{}.components.{}", category.key(), name),
                    *value,
                ));
            }
        }

        for area in &self.problem_areas {
            scores.push((
                format!("problemAreas[{}].severity", area.id),
                f64::from(area.severity),
            ));
        }

        scores
    }

    /// Problem areas ranked by severity, most critical first (stable for ties)
    pub fn ranked_problems(&self) -> Vec<&ProblemArea> {
        let mut ranked: Vec<&ProblemArea> = self.problem_areas.iter().collect();
        ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
        ranked
    }

    /// The `k` most severe problem areas
    pub fn top_problems(&self, k: usize) -> Vec<&ProblemArea> {
        let mut ranked = self.ranked_problems();
        ranked.truncate(k);
        ranked
    }

    /// Severity lookup by problem area id
    pub fn severity_index(&self) -> HashMap<String, u32> {
        self.problem_areas
            .iter()
            .map(|a| (a.id.clone(), a.severity))
            .collect()
    }

    /// Whether a problem area with this id exists
    pub fn contains_problem(&self, id: &str) -> bool {
        self.problem_areas.iter().any(|a| a.id == id)
    }

    /// Problem area counts per severity band
    pub fn severity_distribution(&self) -> SeverityDistribution {
        let mut dist = SeverityDistribution::default();
        for area in &self.problem_areas {
            match area.severity {
                s if s >= CRITICAL_SEVERITY => dist.critical += 1,
                s if s >= MEDIUM_SEVERITY => dist.medium += 1,
                _ => dist.low += 1,
            }
        }
        dist
    }
}

/// Lower bound of the critical band (80-100)
pub const CRITICAL_SEVERITY: u32 = 80;
/// Lower bound of the medium band (50-79)
pub const MEDIUM_SEVERITY: u32 = 50;

/// Problem area counts by severity band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityDistribution {
    pub critical: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityDistribution {
    pub fn total(&self) -> usize {
        self.critical + self.medium + self.low
    }
}

/// Accept `"7"`, `7` or `7.0` as a problem area id
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s.trim().to_string(),
        RawId::Integer(n) => n.to_string(),
        RawId::Float(f) if f.fract() == 0.0 => format!("{}", f as i64),
        RawId::Float(f) => f.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::assessment_json;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_report_parses_and_fills_timestamp() {
        let report = AssessmentReport::from_value(assessment_json(&[("1", 90), ("2", 40)])).unwrap();
        assert_eq!(report.problem_areas.len(), 2);
        assert!(report.meta_info.analysis_timestamp.is_some());
        for (_, score) in report.scores() {
            assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
        }
    }

    #[test]
    fn test_severity_distribution_bands() {
        let report = AssessmentReport::from_value(assessment_json(&[
            ("1", 100),
            ("2", 80),
            ("3", 79),
            ("4", 50),
            ("5", 49),
            ("6", 1),
        ]))
        .unwrap();
        let dist = report.severity_distribution();
        assert_eq!(
            dist,
            SeverityDistribution {
                critical: 2,
                medium: 2,
                low: 2
            }
        );
        assert_eq!(dist.total(), 6);
    }

    #[test]
    fn test_missing_problem_areas_is_malformed() {
        let mut value = assessment_json(&[("1", 90)]);
        value.as_object_mut().unwrap().remove("problemAreas");
        let err = AssessmentReport::from_value(value).unwrap_err();
        match err {
            SchemaViolation::Malformed(msg) => assert!(msg.contains("problemAreas")),
            other => panic!("unexpected violation: {other:?}"),
        }
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let mut value = assessment_json(&[("1", 90)]);
        value["complexityScores"]["cognitiveLoad"]["score"] = json!(140.0);
        let err = AssessmentReport::from_value(value).unwrap_err();
        assert!(matches!(err, SchemaViolation::ScoreOutOfRange { ref path, .. } if path.contains("cognitiveLoad")));
    }

    #[test]
    fn test_zero_score_rejected() {
        let mut value = assessment_json(&[("1", 90)]);
        value["complexityScores"]["overall"] = json!(0.0);
        assert!(matches!(
            AssessmentReport::from_value(value),
            Err(SchemaViolation::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_sub_score_rejected() {
        let mut value = assessment_json(&[("1", 90)]);
        value["complexityScores"]["typographicComplexity"]["components"]
            .as_object_mut()
            .unwrap()
            .remove("readability");
        assert_eq!(
            AssessmentReport::from_value(value).unwrap_err(),
            SchemaViolation::MissingComponent {
                category: "typographicComplexity",
                component: "readability"
            }
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let value = assessment_json(&[("7", 90), ("7", 30)]);
        assert_eq!(
            AssessmentReport::from_value(value).unwrap_err(),
            SchemaViolation::DuplicateId("7".to_string())
        );
    }

    #[test]
    fn test_severity_out_of_range_rejected() {
        let value = assessment_json(&[("1", 101)]);
        assert!(matches!(
            AssessmentReport::from_value(value),
            Err(SchemaViolation::SeverityOutOfRange { severity: 101, .. })
        ));
    }

    #[test]
    fn test_numeric_ids_normalized_to_strings() {
        let mut value = assessment_json(&[("1", 90)]);
        value["problemAreas"][0]["id"] = json!(12);
        let report = AssessmentReport::from_value(value).unwrap();
        assert_eq!(report.problem_areas[0].id, "12");
    }

    #[test]
    fn test_ranking_is_severity_descending_and_stable() {
        let report = AssessmentReport::from_value(assessment_json(&[
            ("a", 40),
            ("b", 90),
            ("c", 40),
            ("d", 75),
        ]))
        .unwrap();

        let ids: Vec<&str> = report.ranked_problems().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);

        let top: Vec<&str> = report.top_problems(2).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(top, vec!["b", "d"]);
    }

    #[test]
    fn test_severity_index() {
        let report = AssessmentReport::from_value(assessment_json(&[("1", 90), ("2", 15)])).unwrap();
        let index = report.severity_index();
        assert_eq!(index.get("1"), Some(&90));
        assert_eq!(index.get("2"), Some(&15));
        assert!(report.contains_problem("2"));
        assert!(!report.contains_problem("3"));
    }
}
