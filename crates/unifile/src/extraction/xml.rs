//! Streaming XML text extraction with `quick-xml`.
//!
//! Runs in constant memory regardless of document size. End-tag names are not
//! checked, so slightly malformed documents still yield their text.
//!
//! ```rust
//! use unifile::extraction::xml::parse_xml;
//!
//! # fn example() -> unifile::Result<()> {
//! let parsed = parse_xml(b"<root><item>Hello</item><item>World</item></root>")?;
//! assert_eq!(parsed.content, "Hello World");
//! assert_eq!(parsed.element_count, 3);
//! assert_eq!(parsed.root.as_deref(), Some("root"));
//! # Ok(())
//! # }
//! ```
use crate::{Result, UnifileError};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    /// Text and CDATA runs joined by single spaces.
    pub content: String,
    pub element_count: usize,
    /// Name of the first element encountered.
    pub root: Option<String>,
}

/// Text of a character or entity reference. Unknown entities are kept as written.
fn resolve_reference(reference: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return ch.to_string();
    }
    let name = String::from_utf8_lossy(reference);
    match resolve_predefined_entity(&name) {
        Some(text) => text.to_string(),
        None => format!("&{};", name),
    }
}

fn flush_run(content: &mut String, run: &mut String) {
    let trimmed = run.trim();
    if !trimmed.is_empty() {
        content.push_str(trimmed);
        content.push(' ');
    }
    run.clear();
}

pub fn parse_xml(xml_bytes: &[u8]) -> Result<XmlText> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().check_end_names = false;

    let mut content = String::new();
    // Text, references and CDATA between two tags.
    let mut run = String::new();
    let mut element_count = 0usize;
    let mut root = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                flush_run(&mut content, &mut run);
                element_count += 1;
                if root.is_none() {
                    let qname = e.name();
                    let name: Cow<str> = String::from_utf8_lossy(qname.as_ref());
                    root = Some(name.into_owned());
                }
            }
            Ok(Event::End(_)) => flush_run(&mut content, &mut run),
            Ok(Event::Text(e)) => run.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => run.push_str(&resolve_reference(&e)),
            Ok(Event::CData(e)) => run.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => {
                flush_run(&mut content, &mut run);
                break;
            }
            Err(e) => {
                return Err(UnifileError::parsing(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(XmlText {
        content: content.trim_end().to_string(),
        element_count,
        root,
    })
}
