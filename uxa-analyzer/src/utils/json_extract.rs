//! JSON extraction from model text
//!
//! Inference services often wrap JSON in prose or Markdown. [`extract_json`]
//! tries, in order: the whole text, each fenced code block, then balanced
//! spans found by bracket counting. Top-level `{...}` objects are preferred
//! over `[...]` lists, and top-level spans over nested ones. String literals
//! and escapes are respected while counting.

use serde::Serialize;
use serde_json::Value;

/// Candidate spans tried by the bracket scan before giving up
const MAX_SCAN_CANDIDATES: usize = 64;

/// How a JSON payload was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Whole text parsed as JSON
    Strict,
    /// Contents of a fenced code block
    FencedBlock,
    /// First balanced bracket span that parses
    BraceScan,
}

/// Recover the first JSON value embedded in `text`
pub fn extract_json(text: &str) -> Option<(Value, ExtractionStrategy)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some((value, ExtractionStrategy::Strict));
    }

    for block in fenced_blocks(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            tracing::debug!("JSON recovered from fenced block");
            return Some((value, ExtractionStrategy::FencedBlock));
        }
    }

    // Objects win over lists so echoed ranges like "[0, 1000]" are skipped.
    // Top-level spans first, so a bare list is not split into its items.
    let top_level = top_level_spans(trimmed);
    for open in ['{', '['] {
        let outer = top_level.iter().copied().filter(|span| span.starts_with(open));
        if let Some(found) = first_parsing(outer, open) {
            return Some(found);
        }
    }
    for open in ['{', '['] {
        if let Some(found) = first_parsing(balanced_spans(trimmed, open), open) {
            return Some(found);
        }
    }

    None
}

fn first_parsing<'a>(
    spans: impl Iterator<Item = &'a str>,
    open: char,
) -> Option<(Value, ExtractionStrategy)> {
    for span in spans.take(MAX_SCAN_CANDIDATES) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            tracing::debug!(span_len = span.len(), %open, "JSON recovered by bracket scan");
            return Some((value, ExtractionStrategy::BraceScan));
        }
    }
    None
}

/// Remove one surrounding code fence (```` ```json ... ``` ````), if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Language tag runs to the end of the opening line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Bodies of fenced code blocks in order of appearance
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(line_end) = after_open.find('\n') else {
            break;
        };
        let body_start = &after_open[line_end + 1..];
        let Some(close) = body_start.find("```") else {
            break;
        };
        blocks.push(&body_start[..close]);
        rest = &body_start[close + 3..];
    }

    blocks
}

/// Balanced spans opened by `open` (`{` or `[`), in order of position
pub fn balanced_spans(text: &str, open: char) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(move |(_, c)| *c == open)
        .filter_map(move |(start, _)| balanced_end(text, start).map(|end| &text[start..end]))
}

/// Balanced spans not nested inside another balanced span, in order of position
pub fn top_level_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(|c: char| c == '{' || c == '[') {
        let start = pos + offset;
        match balanced_end(text, start) {
            Some(end) => {
                spans.push(&text[start..end]);
                pos = end;
            }
            None => pos = start + 1,
        }
    }
    spans
}

/// Byte index just past the bracket closing the one at `start`
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict() {
        let (value, strategy) = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
        assert_eq!(strategy, ExtractionStrategy::Strict);
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here you go:\n```json\n{\"a\": [1, 2]}\n```\nThanks";
        let (value, strategy) = extract_json(text).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
        assert_eq!(strategy, ExtractionStrategy::FencedBlock);
    }

    #[test]
    fn test_brace_scan_respects_strings() {
        let text = r#"Result: {"label": "a } tricky \" {", "n": 2} trailing {"#;
        let (value, strategy) = extract_json(text).unwrap();
        assert_eq!(value, json!({"label": "a } tricky \" {", "n": 2}));
        assert_eq!(strategy, ExtractionStrategy::BraceScan);
    }

    #[test]
    fn test_brace_scan_skips_unparseable_candidates() {
        let text = "Use {placeholder} then {\"ok\": true}";
        let (value, _) = extract_json(text).unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_bare_list_in_prose() {
        let text = "Elements: [{\"id\": \"1\"}] done";
        let (value, _) = extract_json(text).unwrap();
        assert_eq!(value, json!([{"id": "1"}]));
    }

    #[test]
    fn test_object_preferred_over_earlier_list() {
        let text = "Range is [0, 1000].\n{\"items\": [1]}";
        let (value, strategy) = extract_json(text).unwrap();
        assert_eq!(value, json!({"items": [1]}));
        assert_eq!(strategy, ExtractionStrategy::BraceScan);
    }

    #[test]
    fn test_top_level_spans_skip_nested() {
        let spans = top_level_spans("a [1, {\"b\": 2}] c {\"d\": [3]} { open");
        assert_eq!(spans, vec!["[1, {\"b\": 2}]", "{\"d\": [3]}"]);
    }

    #[test]
    fn test_unparseable_outer_object_falls_back_to_inner() {
        let text = "{note: {\"a\": 1}}";
        let (value, _) = extract_json(text).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_nothing_to_extract() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("   ").is_none());
        assert!(extract_json("{ unbalanced").is_none());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fence("  no fence "), "no fence");
    }
}
