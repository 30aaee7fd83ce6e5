//! Delimiter-separated values (CSV, TSV).
//!
//! A small RFC 4180 reader: quoted fields may contain the delimiter, doubled quotes
//! and line breaks. Rows may be ragged; nothing is padded.

use crate::{Result, UnifileError};

/// Parse `text` into rows of fields.
///
/// # Errors
///
/// Returns `Parsing` if a quoted field is never closed.
pub fn parse_delimited(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0usize;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(UnifileError::parsing(format!(
            "Unterminated quoted field starting on line {}",
            quote_line
        )));
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(rows)
}

/// Delimiter for a file extension (`tsv` and `tab` use tabs, everything else commas).
pub fn delimiter_for(extension: &str) -> char {
    match extension {
        "tsv" | "tab" => '\t',
        _ => ',',
    }
}
