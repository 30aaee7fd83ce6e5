//! Format-level parsing helpers used by the built-in extractors.
//!
//! These functions know nothing about units, dispatch or configuration; they turn
//! bytes or text into plain Rust values that the extractors then wrap.

#[cfg(feature = "archives")]
pub mod archive;
pub mod delimited;
pub mod html;
pub mod structured;
pub mod text;
pub mod xml;

#[cfg(feature = "archives")]
pub use archive::{ArchiveFormat, UnpackReport, unpack};
pub use delimited::{delimiter_for, parse_delimited};
pub use html::{HtmlText, convert_html_to_markdown, html_to_text};
pub use structured::{NdjsonLine, flatten_json, looks_like_ndjson, parse_ndjson};
pub use text::{BlockKind, TextBlock, markdown_blocks, markdown_to_text, split_blocks};
pub use xml::{XmlText, parse_xml};
