//! HTML to text via `html-to-markdown-rs`.
//!
//! The page is converted to Markdown with metadata extraction on, the `title` is
//! read from the YAML frontmatter the converter emits, and the remaining Markdown
//! is reduced to plain text block by block. No readability analysis is attempted.
//!
//! ```rust
//! use unifile::extraction::html::html_to_text;
//!
//! # fn example() -> unifile::Result<()> {
//! let parsed = html_to_text("<html><head><title>Home</title></head><body><p>Hello</p></body></html>")?;
//! assert_eq!(parsed.title.as_deref(), Some("Home"));
//! assert_eq!(parsed.text, "Hello");
//! # Ok(())
//! # }
//! ```
use std::{any::Any, thread};

use html_to_markdown_rs::{ConversionOptions, PreprocessingOptions, convert as convert_html};
use serde_yaml_ng::Value as YamlValue;

use crate::extraction::text::markdown_to_text;
use crate::{Result, UnifileError};

const LARGE_HTML_STACK_THRESHOLD_BYTES: usize = 512 * 1024;
const HTML_CONVERSION_STACK_SIZE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlText {
    pub title: Option<String>,
    pub text: String,
}

fn conversion_options() -> ConversionOptions {
    ConversionOptions {
        extract_metadata: true,
        hocr_spatial_tables: false,
        preprocessing: PreprocessingOptions {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn convert_with_options(html: &str) -> Result<String> {
    convert_html(html, Some(conversion_options()))
        .map_err(|e| UnifileError::parsing(format!("Failed to convert HTML to Markdown: {}", e)))
}

/// Runs the conversion on a thread with a 16 MiB stack.
fn convert_on_dedicated_stack(html: String) -> Result<String> {
    let handle = thread::Builder::new()
        .name("unifile-html-conversion".to_string())
        .stack_size(HTML_CONVERSION_STACK_SIZE_BYTES)
        .spawn(move || convert_with_options(&html))
        .map_err(|e| UnifileError::Other(format!("Failed to spawn HTML conversion thread: {}", e)))?;

    match handle.join() {
        Ok(result) => result,
        Err(panic) => Err(UnifileError::Other(format!(
            "HTML conversion panicked: {}",
            panic_reason(&panic)
        ))),
    }
}

fn panic_reason(panic: &Box<dyn Any + Send + 'static>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Convert HTML to Markdown, with page metadata as YAML frontmatter.
pub fn convert_html_to_markdown(html: &str) -> Result<String> {
    if html.len() >= LARGE_HTML_STACK_THRESHOLD_BYTES {
        convert_on_dedicated_stack(html.to_string())
    } else {
        convert_with_options(html)
    }
}

/// Split leading YAML frontmatter off `markdown`, returning its `title` and the body.
fn split_frontmatter(markdown: &str) -> (Option<String>, &str) {
    let Some(after_opening) = markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))
    else {
        return (None, markdown);
    };

    let (yaml, body) = if let Some(rest) = after_opening.strip_prefix("---") {
        ("", rest)
    } else if let Some(pos) = after_opening.find("\n---") {
        (&after_opening[..pos], &after_opening[pos + 4..])
    } else {
        return (None, markdown);
    };

    let title = serde_yaml_ng::from_str::<YamlValue>(yaml)
        .ok()
        .and_then(|value| value.get("title").and_then(|t| t.as_str()).map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty());
    (title, body.trim_start_matches(['\r', '\n']))
}

pub fn html_to_text(html: &str) -> Result<HtmlText> {
    let markdown = convert_html_to_markdown(html)?;
    let (title, body) = split_frontmatter(&markdown);
    Ok(HtmlText {
        title,
        text: markdown_to_text(body),
    })
}
