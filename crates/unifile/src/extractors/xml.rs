//! XML extractor.

use std::path::Path;

use crate::Result;
use crate::core::dispatch::ExtractionContext;
use crate::extraction::xml::parse_xml;
use crate::plugins::Extractor;
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["xml"];

#[derive(Debug, Default, Clone)]
pub struct XmlExtractor;

impl Extractor for XmlExtractor {
    fn name(&self) -> &str {
        "xml"
    }

    fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(super::failure(path, e.into())),
        };

        match parse_xml(&bytes) {
            Ok(parsed) => Ok(vec![
                Unit::ok(path, "", UnitType::File, "body", parsed.content)
                    .with_metadata("element_count", parsed.element_count)
                    .with_metadata("root", parsed.root),
            ]),
            Err(e) => Ok(super::failure(path, e)),
        }
    }
}
