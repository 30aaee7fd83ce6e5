//! Plain text and Markdown block splitting.
//!
//! Plain text is split on blank lines and every block is a paragraph. Markdown is
//! parsed with `pulldown-cmark`: headings (ATX and setext), list items, code blocks
//! (fenced and indented), tables and paragraphs each become one block. Inline markup
//! is reduced to its text.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    ListItem,
    Code,
    Paragraph,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::ListItem => "list_item",
            BlockKind::Code => "code",
            BlockKind::Paragraph => "paragraph",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
}

fn flush_paragraph(blocks: &mut Vec<TextBlock>, lines: &mut Vec<&str>) {
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        blocks.push(TextBlock {
            kind: BlockKind::Paragraph,
            text: trimmed.to_string(),
        });
    }
    lines.clear();
}

/// Split plain text into paragraphs separated by blank lines.
pub fn split_blocks(text: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut blocks, &mut lines);
        } else {
            lines.push(line);
        }
    }
    flush_paragraph(&mut blocks, &mut lines);
    blocks
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<TextBlock>,
    current: Option<(BlockKind, String)>,
    item_depth: usize,
}

impl BlockCollector {
    fn begin(&mut self, kind: BlockKind) {
        self.finish();
        self.current = Some((kind, String::new()));
    }

    fn finish(&mut self) {
        let Some((kind, text)) = self.current.take() else {
            return;
        };
        let text = match kind {
            BlockKind::Code => text.trim_end_matches('\n').to_string(),
            _ => text.trim().to_string(),
        };
        // Empty code blocks are still code; other empty blocks are dropped.
        if !text.is_empty() || kind == BlockKind::Code {
            self.blocks.push(TextBlock { kind, text });
        }
    }

    fn in_item(&self) -> bool {
        matches!(self.current, Some((BlockKind::ListItem, _)))
    }

    fn push_text(&mut self, text: &str) {
        let kind = if self.item_depth > 0 {
            BlockKind::ListItem
        } else {
            BlockKind::Paragraph
        };
        self.current.get_or_insert_with(|| (kind, String::new())).1.push_str(text);
    }

    /// Push `sep` unless the block is empty or already ends a line.
    fn separate(&mut self, sep: char) {
        if let Some((_, text)) = &mut self.current {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push(sep);
            }
        }
    }
}

/// Split Markdown into typed blocks, in document order.
pub fn markdown_blocks(markdown: &str) -> Vec<TextBlock> {
    let mut collector = BlockCollector::default();
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { .. }) => collector.begin(BlockKind::Heading),
            Event::Start(Tag::CodeBlock(_)) => collector.begin(BlockKind::Code),
            Event::Start(Tag::Item) => {
                collector.item_depth += 1;
                collector.begin(BlockKind::ListItem);
            }
            Event::Start(Tag::Paragraph) => {
                if collector.in_item() {
                    collector.separate('\n');
                } else {
                    collector.begin(BlockKind::Paragraph);
                }
            }
            Event::Start(Tag::Table(_)) => collector.begin(BlockKind::Paragraph),
            Event::Start(Tag::TableCell) => collector.separate('\t'),
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => collector.push_text("\n"),
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::CodeBlock) | Event::End(TagEnd::Table) => {
                collector.finish()
            }
            Event::End(TagEnd::Paragraph) => {
                if !collector.in_item() {
                    collector.finish();
                }
            }
            Event::End(TagEnd::Item) => {
                collector.finish();
                collector.item_depth = collector.item_depth.saturating_sub(1);
            }
            Event::Text(text) | Event::Code(text) => collector.push_text(&text),
            Event::SoftBreak | Event::HardBreak => collector.push_text("\n"),
            _ => {}
        }
    }

    collector.finish();
    collector.blocks
}

/// Markdown reduced to plain text: block texts separated by blank lines.
pub fn markdown_to_text(markdown: &str) -> String {
    markdown_blocks(markdown)
        .into_iter()
        .filter(|b| !b.text.is_empty())
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("\n\n")
}
