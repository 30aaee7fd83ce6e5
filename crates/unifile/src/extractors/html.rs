//! HTML extractor.

use std::path::Path;

use crate::Result;
use crate::core::dispatch::ExtractionContext;
use crate::extraction::html::html_to_text;
use crate::plugins::Extractor;
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];

/// Emits the text of a page as one `file` unit, with the `<title>` as metadata.
///
/// The page goes through Markdown first, so headings, paragraphs and list items
/// come out as blank-line separated blocks.
#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn name(&self) -> &str {
        "html"
    }

    fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let html = match super::read_text(path) {
            Ok(html) => html,
            Err(e) => return Ok(super::failure(path, e)),
        };

        let parsed = match html_to_text(&html) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(super::failure(path, e)),
        };
        let unit = Unit::ok(path, "", UnitType::File, "body", parsed.text);
        Ok(vec![match parsed.title {
            Some(title) => unit.with_metadata("title", title),
            None => unit,
        }])
    }
}
