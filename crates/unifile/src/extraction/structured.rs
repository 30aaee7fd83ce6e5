//! JSON and newline-delimited JSON flattening.
//!
//! Nested values become `path=value` lines, with object keys joined by `.` and
//! array positions written as `[i]`:
//!
//! ```rust
//! use unifile::extraction::structured::flatten_json;
//!
//! let value = serde_json::json!({"user": {"name": "Ada", "tags": ["x", "y"]}});
//! assert_eq!(flatten_json(&value), vec!["user.name=Ada", "user.tags[0]=x", "user.tags[1]=y"]);
//! ```

use serde_json::Value;

/// Nesting beyond this depth is rendered as compact JSON instead of recursing.
const MAX_DEPTH: usize = 64;

/// Flatten a JSON value into `key=value` lines.
///
/// A top-level scalar yields a single line holding just the value.
pub fn flatten_json(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    flatten_into(value, String::new(), 0, &mut lines);
    lines
}

fn flatten_into(value: &Value, prefix: String, depth: usize, lines: &mut Vec<String>) {
    if depth >= MAX_DEPTH {
        lines.push(render_line(&prefix, &value.to_string()));
        return;
    }

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, path, depth + 1, lines);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, format!("{}[{}]", prefix, i), depth + 1, lines);
            }
        }
        Value::String(s) => lines.push(render_line(&prefix, s)),
        other => lines.push(render_line(&prefix, &other.to_string())),
    }
}

fn render_line(key: &str, value: &str) -> String {
    if key.is_empty() {
        value.to_string()
    } else {
        format!("{}={}", key, value)
    }
}

/// One parsed NDJSON line.
#[derive(Debug, Clone, PartialEq)]
pub enum NdjsonLine {
    /// 1-based line number and flattened content.
    Parsed { line: usize, content: String },
    Invalid { line: usize, message: String },
}

/// Parse newline-delimited JSON, flattening each non-blank line independently.
pub fn parse_ndjson(text: &str) -> Vec<NdjsonLine> {
    text.lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(idx, raw)| match serde_json::from_str::<Value>(raw) {
            Ok(value) => NdjsonLine::Parsed {
                line: idx + 1,
                content: flatten_json(&value).join("\n"),
            },
            Err(e) => NdjsonLine::Invalid {
                line: idx + 1,
                message: format!("Invalid JSON on line {}: {}", idx + 1, e),
            },
        })
        .collect()
}

/// True when the text looks like NDJSON: several non-blank lines, each starting an object or array.
pub fn looks_like_ndjson(text: &str) -> bool {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first_two: Vec<&str> = lines.by_ref().take(2).collect();
    first_two.len() == 2
        && first_two.iter().all(|l| l.starts_with('{') && l.ends_with('}'))
        && serde_json::from_str::<Value>(first_two[0]).is_ok()
}
