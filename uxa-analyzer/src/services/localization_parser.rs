//! Localization response parsing and repair
//!
//! Fallback chain, each step logged:
//! 1. Recover a JSON value (strict → fenced block → bracket scan)
//! 2. Find the element list: `element_coordinates`, a bare list (wrapped),
//!    or another key holding element-shaped objects (adopted); else empty
//! 3. Coerce each element; malformed boxes drop the element
//!
//! A response that yields nothing is still a successful parse with zero elements.

use crate::models::localization::{BoundingBox, LocalizationDocument, LocalizedElement, ELEMENTS_KEY};
use crate::utils::json_extract::{extract_json, ExtractionStrategy};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Keys accepted for the box of an element
const BOX_KEYS: [&str; 4] = ["coordinates", "box_2d", "bbox", "bounding_box"];
/// Keys accepted for the label of an element
const LABEL_KEYS: [&str; 3] = ["element", "label", "name"];

/// Where the element list was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "shape", content = "key")]
pub enum ListSource {
    /// Under the expected key
    ExpectedKey,
    /// Payload was a bare list
    WrappedList,
    /// Under another key holding element-shaped objects
    AdoptedKey(String),
    /// Nothing usable
    Empty,
}

/// Why an element was discarded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedElement {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Parse result with the repair steps taken
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedLocalization {
    pub elements: Vec<LocalizedElement>,
    /// How JSON was recovered (None when no JSON was found)
    pub extraction: Option<ExtractionStrategy>,
    pub list_source: ListSource,
    pub dropped: Vec<DroppedElement>,
}

impl ParsedLocalization {
    pub fn empty(extraction: Option<ExtractionStrategy>) -> Self {
        Self {
            elements: Vec::new(),
            extraction,
            list_source: ListSource::Empty,
            dropped: Vec::new(),
        }
    }

    /// Elements with a bounding box
    pub fn usable(&self) -> impl Iterator<Item = &LocalizedElement> {
        self.elements.iter().filter(|e| e.bounding_box.is_some())
    }

    pub fn usable_count(&self) -> usize {
        self.usable().count()
    }

    pub fn to_document(&self) -> LocalizationDocument {
        LocalizationDocument {
            element_coordinates: self.elements.clone(),
        }
    }

    /// One-line repair summary, None for a clean parse
    pub fn repair_note(&self) -> Option<String> {
        let mut notes = Vec::new();
        match self.extraction {
            None => notes.push("no JSON found in response".to_string()),
            Some(ExtractionStrategy::Strict) => {}
            Some(other) => notes.push(format!("JSON recovered via {:?}", other)),
        }
        match &self.list_source {
            ListSource::ExpectedKey => {}
            ListSource::WrappedList => notes.push("bare list wrapped".to_string()),
            ListSource::AdoptedKey(key) => notes.push(format!("elements adopted from key '{key}'")),
            ListSource::Empty if self.extraction.is_some() => {
                notes.push(format!("no '{ELEMENTS_KEY}' list found"))
            }
            ListSource::Empty => {}
        }
        if !self.dropped.is_empty() {
            notes.push(format!("{} element(s) dropped", self.dropped.len()));
        }
        if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        }
    }
}

/// Parse raw localization text
pub fn parse_localization_response(raw: &str) -> ParsedLocalization {
    let Some((payload, extraction)) = extract_json(raw) else {
        warn!(response_len = raw.len(), "Localization response contains no JSON, using empty list");
        return ParsedLocalization::empty(None);
    };
    debug!(strategy = ?extraction, "Localization JSON extracted");

    let (items, list_source) = locate_list(payload);
    if list_source != ListSource::ExpectedKey {
        warn!(source = ?list_source, "Localization payload missing '{}'", ELEMENTS_KEY);
    }

    let mut elements = Vec::new();
    let mut dropped = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match coerce_element(&item) {
            Ok(element) => elements.push(element),
            Err(reason) => {
                let id = item.get("id").and_then(id_text);
                debug!(index, id = ?id, reason = %reason, "Dropping localized element");
                dropped.push(DroppedElement { index, id, reason });
            }
        }
    }

    ParsedLocalization {
        elements,
        extraction: Some(extraction),
        list_source,
        dropped,
    }
}

fn locate_list(payload: Value) -> (Vec<Value>, ListSource) {
    match payload {
        Value::Array(items) => (items, ListSource::WrappedList),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove(ELEMENTS_KEY) {
                return (items, ListSource::ExpectedKey);
            }
            let adopted = map
                .iter()
                .find(|(_, v)| is_element_list(v))
                .map(|(k, _)| k.clone());
            match adopted {
                Some(key) => match map.remove(&key) {
                    Some(Value::Array(items)) => (items, ListSource::AdoptedKey(key)),
                    _ => (Vec::new(), ListSource::Empty),
                },
                None => (Vec::new(), ListSource::Empty),
            }
        }
        _ => (Vec::new(), ListSource::Empty),
    }
}

fn is_element_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().any(is_element_shaped),
        _ => false,
    }
}

fn is_element_shaped(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.contains_key("id") && BOX_KEYS.iter().any(|k| o.contains_key(*k)))
        .unwrap_or(false)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
            (None, Some(f)) => Some(f.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn first_key<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// Coerce one list item into an element, or explain why it was dropped
fn coerce_element(item: &Value) -> Result<LocalizedElement, String> {
    let map = item.as_object().ok_or("not an object")?;
    let id = map.get("id").and_then(id_text).ok_or("missing id")?;

    let label = first_key(map, &LABEL_KEYS)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let bounding_box = match first_key(map, &BOX_KEYS) {
        None | Some(Value::Null) => None,
        Some(Value::Array(values)) => {
            let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            if values.len() != 4 || numbers.len() != 4 {
                return Err("box is not four numbers".to_string());
            }
            let b = BoundingBox::clamped(numbers[0], numbers[1], numbers[2], numbers[3])
                .ok_or("box violates x_min < x_max, y_min < y_max")?;
            Some(b)
        }
        Some(_) => return Err("box is not a list".to_string()),
    };

    let confidence = map
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    Ok(LocalizedElement {
        id,
        label,
        bounding_box,
        confidence,
    })
}
