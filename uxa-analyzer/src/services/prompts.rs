//! Prompt construction for the inference services
//!
//! Defaults are compiled in; each template can be replaced by a file named
//! in the config. Narrative templates substitute `{analysis_json}` and may be
//! wrapped in `<prompt>...</prompt>`.

use crate::models::assessment::{Category, ProblemArea};
use crate::models::screen_image::ContextHints;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Forced function tool carrying the assessment
pub const ASSESSMENT_TOOL_NAME: &str = "record_ui_analysis";

/// Placeholder replaced by the serialized assessment
pub const ANALYSIS_PLACEHOLDER: &str = "{analysis_json}";

pub const DEFAULT_ASSESSMENT_SYSTEM_PROMPT: &str = "\
You are a senior human-computer interaction researcher performing an expert usability \
assessment of a single user interface screenshot.

Score six categories on a 1-100 scale, where higher means more complex and harder to use: \
structural and visual organization, visual-perceptual complexity, typographic complexity, \
information load, cognitive load and operational complexity. Score every listed sub-component, \
explain each category score, and give a short rationale per sub-component.

Then list the concrete usability problem areas you observe. Give each a unique id, its category \
and subcategory, a precise description, where it is on the screen, a severity from 1 (cosmetic) \
to 100 (blocks the task), and the HCI principle that explains it.

Ground every judgement in what is visible. Record the result with the provided tool.";

pub const DEFAULT_INTERPRETATION_TEMPLATE: &str = "\
<prompt>
You are a strategic UX analyst. Below is a structured usability assessment of one interface \
screenshot, produced by an expert reviewer.

<analysis>
{analysis_json}
</analysis>

Interpret the assessment beyond the individual scores. Respond with JSON only:

{
  \"strategicInterpretation\": {
    \"cognitiveEcosystem\": \"how the categories interact to shape the user's mental effort\",
    \"businessUserTension\": \"where business goals visible in the layout work against users\",
    \"attentionArchitecture\": \"how the design directs and fragments attention\",
    \"perceptualCrossroads\": \"points where perception and interaction demands collide\",
    \"hiddenPatterns\": \"non-obvious patterns connecting the problem areas\"
  }
}
</prompt>";

pub const DEFAULT_RECOMMENDATIONS_TEMPLATE: &str = "\
<prompt>
You are a principal product designer. Below is a structured usability assessment of one \
interface screenshot.

<analysis>
{analysis_json}
</analysis>

Propose three to five strategic recommendations that address the most severe problem areas. \
Respond with JSON only:

{
  \"strategicRecommendations\": [
    {
      \"title\": \"short name\",
      \"problemStatement\": \"which problem areas this addresses and why they matter\",
      \"solutionDescription\": \"the concrete design change\",
      \"businessConstraints\": \"trade-offs and constraints to respect\",
      \"expectedImpact\": \"measurable effect on users and the business\",
      \"crossDomainExample\": \"a product from another domain that solved this well\",
      \"testingApproach\": \"how to validate the change\"
    }
  ]
}
</prompt>";

/// User message accompanying the screenshot
pub fn assessment_user_message(hints: &ContextHints) -> String {
    format!(
        "Analyze the provided user interface screenshot.\n\
         Interface Type Hint: {}\n\
         User Scenario Hint: {}\n\n\
         Perform a detailed analysis based on the system prompt and return the results using the '{}' tool.",
        hints.interface_type, hints.user_scenario, ASSESSMENT_TOOL_NAME
    )
}

fn score_property() -> Value {
    json!({"type": "number", "minimum": 1, "maximum": 100})
}

/// JSON schema of the assessment report
pub fn assessment_schema() -> Value {
    let mut categories = Map::new();
    categories.insert("overall".into(), score_property());

    for category in Category::ALL {
        let components: Map<String, Value> = category
            .required_components()
            .iter()
            .map(|c| (c.to_string(), score_property()))
            .collect();
        categories.insert(
            category.key().into(),
            json!({
                "type": "object",
                "description": category.title(),
                "properties": {
                    "score": score_property(),
                    "components": {
                        "type": "object",
                        "properties": components,
                        "required": category.required_components(),
                    },
                    "reasoning": {"type": "string"},
                    "componentReasonings": {"type": "object", "additionalProperties": {"type": "string"}}
                },
                "required": ["score", "components", "reasoning", "componentReasonings"]
            }),
        );
    }

    let mut required_categories = vec!["overall"];
    required_categories.extend(Category::ALL.iter().map(|c| c.key()));

    json!({
        "type": "object",
        "properties": {
            "metaInfo": {
                "type": "object",
                "properties": {
                    "interfaceType": {"type": "string", "description": "Type of interface (e.g., Search Results Page, Dashboard)"},
                    "userScenarios": {"type": "array", "items": {"type": "string"}},
                    "overallComplexityScore": score_property(),
                    "analysisTimestamp": {"type": "string", "format": "date-time"}
                },
                "required": ["interfaceType", "userScenarios", "overallComplexityScore", "analysisTimestamp"]
            },
            "complexityScores": {
                "type": "object",
                "description": "Complexity scores by category (1-100 scale)",
                "properties": categories,
                "required": required_categories
            },
            "problemAreas": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": ["integer", "string"]},
                        "category": {"type": "string"},
                        "subcategory": {"type": "string"},
                        "description": {"type": "string"},
                        "location": {"type": "string"},
                        "severity": {"type": "integer", "minimum": 1, "maximum": 100},
                        "scientificReasoning": {"type": "string"}
                    },
                    "required": ["id", "category", "subcategory", "description", "location", "severity", "scientificReasoning"]
                }
            }
        },
        "required": ["metaInfo", "complexityScores", "problemAreas"]
    })
}

/// `tools` entry for the chat-completions request
pub fn assessment_tool_definition() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": ASSESSMENT_TOOL_NAME,
            "description": "Records the detailed UI analysis results based on the provided schema.",
            "parameters": assessment_schema()
        }
    })
}

/// Localization prompt listing the ranked problem areas
pub fn localization_prompt(areas: &[&ProblemArea]) -> String {
    let elements: String = areas
        .iter()
        .map(|a| {
            format!(
                "- ID: {}, Severity: {}, Description: {}, Location Hint: {}\n",
                a.id, a.severity, a.description, a.location
            )
        })
        .collect();

    format!(
        "You are a visual analysis system that extracts precise coordinates for identified UI usability \
issues in a screenshot.

<problematic_elements>
{elements}</problematic_elements>

Instructions:
1. Use a normalized coordinate system from 0 to 1000 on both axes, origin at the TOP LEFT.
   Return each box as [y_min, x_min, y_max, x_max].
2. For each listed ID find the described element and return the tightest box around that element only.
   Use the Location Hint. If an element cannot be located, set its coordinates to null.
3. Ensure x_min < x_max and y_min < y_max for every box.
4. Give each element a confidence between 0.0 and 1.0.

Respond ONLY with JSON of this shape:
{{
  \"element_coordinates\": [
    {{\"id\": \"problem area id\", \"element\": \"brief description\", \"coordinates\": [y_min, x_min, y_max, x_max], \"confidence\": 0.0}}
  ]
}}"
    )
}

/// Remove a surrounding `<prompt>...</prompt>` wrapper
pub fn strip_prompt_wrapper(template: &str) -> &str {
    let trimmed = template.trim();
    trimmed
        .strip_prefix("<prompt>")
        .and_then(|rest| rest.strip_suffix("</prompt>"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Substitute the serialized assessment into a narrative template
pub fn render_narrative_prompt(template: &str, analysis_json: &str) -> String {
    strip_prompt_wrapper(template).replace(ANALYSIS_PLACEHOLDER, analysis_json)
}

/// Template from `path`, or `default` when no path is configured
pub fn load_template(path: Option<&Path>, default: &str) -> uxa_common::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| {
            uxa_common::Error::Config(format!("Cannot read prompt template {}: {}", p.display(), e))
        }),
        None => Ok(default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(id: &str, severity: u32) -> ProblemArea {
        ProblemArea {
            id: id.into(),
            category: "cognitiveLoad".into(),
            subcategory: "workingMemoryLoad".into(),
            description: "Too many options".into(),
            location: "left sidebar".into(),
            severity,
            rationale: "Hick's law".into(),
        }
    }

    #[test]
    fn test_localization_prompt_lists_areas() {
        let a = area("3", 88);
        let prompt = localization_prompt(&[&a]);
        assert!(prompt.contains(
            "- ID: 3, Severity: 88, Description: Too many options, Location Hint: left sidebar"
        ));
        assert!(prompt.contains("element_coordinates"));
        assert!(prompt.contains("[y_min, x_min, y_max, x_max]"));
    }

    #[test]
    fn test_narrative_prompt_substitution() {
        let prompt = render_narrative_prompt(DEFAULT_INTERPRETATION_TEMPLATE, "{\"x\": 1}");
        assert!(!prompt.starts_with("<prompt>"));
        assert!(!prompt.contains(ANALYSIS_PLACEHOLDER));
        assert!(prompt.contains("{\"x\": 1}"));
        assert!(prompt.contains("strategicInterpretation"));
    }

    #[test]
    fn test_strip_prompt_wrapper_leaves_plain_text() {
        assert_eq!(strip_prompt_wrapper("  plain "), "plain");
        assert_eq!(strip_prompt_wrapper("<prompt>\nbody\n</prompt>"), "body");
    }

    #[test]
    fn test_schema_requires_every_sub_score() {
        let schema = assessment_schema();
        let required = &schema["properties"]["complexityScores"]["properties"]["cognitiveLoad"]
            ["properties"]["components"]["required"];
        assert_eq!(required.as_array().unwrap().len(), 4);
        assert_eq!(
            assessment_tool_definition()["function"]["name"],
            ASSESSMENT_TOOL_NAME
        );
    }

    #[test]
    fn test_user_message_carries_hints() {
        let msg = assessment_user_message(&ContextHints::new(Some("Dashboard".into()), None));
        assert!(msg.contains("Interface Type Hint: Dashboard"));
        assert!(msg.contains("User Scenario Hint: Not specified"));
    }

    #[test]
    fn test_missing_template_file_is_config_error() {
        let err = load_template(Some(Path::new("/nope/template.md")), "x").unwrap_err();
        assert!(matches!(err, uxa_common::Error::Config(_)));
    }
}
