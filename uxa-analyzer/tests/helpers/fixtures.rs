//! JSON payloads shaped like real service responses

use serde_json::{json, Map, Value};
use uxa_analyzer::models::Category;

fn block(score: f64, category: Category) -> Value {
    let components: Map<String, Value> = category
        .required_components()
        .iter()
        .map(|c| (c.to_string(), json!(score)))
        .collect();
    json!({
        "score": score,
        "components": components,
        "reasoning": format!("{} rationale", category.title()),
    })
}

/// Valid assessment with the given (id, severity) problem areas
pub fn assessment_json(problems: &[(&str, u32)]) -> Value {
    let mut scores = Map::new();
    scores.insert("overall".into(), json!(64.0));
    for category in Category::ALL {
        scores.insert(category.key().into(), block(58.0, category));
    }
    let areas: Vec<Value> = problems
        .iter()
        .map(|(id, severity)| {
            json!({
                "id": id,
                "category": "visualComplexity",
                "subcategory": "clutter",
                "description": format!("Crowded region {id}"),
                "location": "upper left",
                "severity": severity,
                "scientificReasoning": "Visual search time grows with clutter"
            })
        })
        .collect();

    json!({
        "metaInfo": {
            "interfaceType": "Settings page",
            "userScenarios": ["Change notification preferences"],
            "overallComplexityScore": 64.0
        },
        "complexityScores": Value::Object(scores),
        "problemAreas": areas
    })
}

/// Clean localization response for (id, [y_min, x_min, y_max, x_max]) pairs
pub fn localization_json(elements: &[(&str, [f64; 4])]) -> String {
    let items: Vec<Value> = elements
        .iter()
        .map(|(id, coords)| {
            json!({
                "id": id,
                "element": format!("Element {id}"),
                "coordinates": coords,
                "confidence": 0.8
            })
        })
        .collect();
    json!({ "element_coordinates": items }).to_string()
}
