//! Plain text and Markdown extractor.

use std::path::Path;

use crate::Result;
use crate::core::config::{ExtractorSettings, RuntimeOption};
use crate::core::dispatch::ExtractionContext;
use crate::extraction::text::{markdown_blocks, split_blocks};
use crate::plugins::{Extractor, path_extension};
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["txt", "md", "markdown", "log", "rst"];

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

fn is_markdown(path: &Path) -> bool {
    path_extension(path).is_some_and(|e| MARKDOWN_EXTENSIONS.contains(&e.as_str()))
}

/// Splits text files into blocks.
///
/// Markdown files yield heading, paragraph, list-item and code blocks; other text
/// files yield one paragraph per blank-line separated run. Each block becomes a
/// `block` unit. With block typing on, units carry a `block_type` metadata key
/// naming the block kind.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    block_types: bool,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self { block_types: true }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn accepted_options(&self) -> &[RuntimeOption] {
        &[RuntimeOption::EnableBlockTypes]
    }

    fn configure(&mut self, settings: &ExtractorSettings) {
        if let Some(enabled) = settings.bool(RuntimeOption::EnableBlockTypes) {
            self.block_types = enabled;
        }
    }

    fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let text = match super::read_text(path) {
            Ok(text) => text,
            Err(e) => return Ok(super::failure(path, e)),
        };

        let blocks = if is_markdown(path) {
            markdown_blocks(&text)
        } else {
            split_blocks(&text)
        };
        if blocks.is_empty() {
            return Ok(vec![Unit::ok(path, "", UnitType::File, "0", "")]);
        }

        Ok(blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| {
                let unit = Unit::ok(path, "", UnitType::Block, i.to_string(), block.text);
                if self.block_types {
                    unit.with_metadata("block_type", block.kind.as_str())
                } else {
                    unit
                }
            })
            .collect())
    }
}
