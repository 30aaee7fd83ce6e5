//! JSON and NDJSON extractor.

use std::path::Path;

use serde_json::Value;

use crate::Result;
use crate::core::dispatch::ExtractionContext;
use crate::extraction::structured::{NdjsonLine, flatten_json, looks_like_ndjson, parse_ndjson};
use crate::plugins::{Extractor, path_extension};
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["json", "ndjson", "jsonl"];

/// Flattens JSON documents into `path=value` lines.
///
/// `.ndjson`/`.jsonl` files, and `.json` files that turn out to hold one object per
/// line, produce one `segment` unit per line; a bad line becomes an error unit
/// without affecting its neighbours. A `.json` file that does not parse at all is
/// kept as raw text with `format: text`.
#[derive(Debug, Default, Clone)]
pub struct JsonExtractor;

impl JsonExtractor {
    fn ndjson_units(path: &Path, text: &str) -> Vec<Unit> {
        parse_ndjson(text)
            .into_iter()
            .enumerate()
            .map(|(i, line)| match line {
                NdjsonLine::Parsed { line, content } => Unit::ok(path, "", UnitType::Segment, i.to_string(), content)
                    .with_metadata("format", "ndjson")
                    .with_metadata("line", line),
                NdjsonLine::Invalid { line, message } => {
                    Unit::error(path, "", UnitType::Segment, i.to_string(), message)
                        .with_metadata("format", "ndjson")
                        .with_metadata("line", line)
                        .with_metadata("exception", "parsing")
                }
            })
            .collect()
    }
}

impl Extractor for JsonExtractor {
    fn name(&self) -> &str {
        "json"
    }

    fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let text = match super::read_text(path) {
            Ok(text) => text,
            Err(e) => return Ok(super::failure(path, e)),
        };

        let line_delimited = matches!(path_extension(path).as_deref(), Some("ndjson" | "jsonl"));
        if line_delimited {
            return Ok(Self::ndjson_units(path, &text));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(vec![
                Unit::ok(path, "", UnitType::File, "body", flatten_json(&value).join("\n")).with_metadata("format", "json"),
            ]),
            Err(_) if looks_like_ndjson(&text) => Ok(Self::ndjson_units(path, &text)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "JSON did not parse, keeping raw text");
                Ok(vec![
                    Unit::ok(path, "", UnitType::File, "body", text.trim()).with_metadata("format", "text"),
                ])
            }
        }
    }
}
