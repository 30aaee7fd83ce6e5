//! Post-extraction chunking of table rows.
//!
//! Splits the content of every successful row into `chunk` rows using
//! `text-splitter`, preferring sentence and word boundaries over hard cuts.
//! Error rows and rows without content are passed through unchanged.
//!
//! ```rust
//! use unifile::chunking::chunk_table;
//! use unifile::table::Table;
//! use unifile::types::{Unit, UnitType};
//! use std::path::Path;
//!
//! # fn example() -> unifile::Result<()> {
//! let long = "First sentence here. ".repeat(20);
//! let table = Table::from_units(&[Unit::ok(Path::new("a.txt"), "txt", UnitType::Block, "0", long)]);
//! let chunked = chunk_table(&table, 100, 10)?;
//! assert!(chunked.len() > 1);
//! assert_eq!(chunked.rows()[0].unit_id.as_deref(), Some("0:0"));
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use text_splitter::{Characters, ChunkCapacity, ChunkConfig, TextSplitter};

use crate::table::{Row, Table};
use crate::types::UnitType;
use crate::{Result, UnifileError};

fn build_chunk_config(max_characters: usize, overlap: usize) -> Result<ChunkConfig<Characters>> {
    if max_characters == 0 {
        return Err(UnifileError::validation("max_characters must be greater than 0"));
    }
    ChunkConfig::new(ChunkCapacity::new(max_characters))
        .with_overlap(overlap)
        .map(|config| config.with_trim(true))
        .map_err(|e| UnifileError::validation(format!("Invalid chunking configuration: {}", e)))
}

fn chunk_row(parent: &Row, index: usize, total: usize, text: &str) -> Row {
    let parent_id = parent.unit_id.clone().unwrap_or_default();
    let mut metadata = parent.metadata.clone().unwrap_or_default();
    metadata.insert(
        "parent_unit_type".to_string(),
        parent.unit_type.clone().map(Value::String).unwrap_or(Value::Null),
    );
    metadata.insert("parent_unit_id".to_string(), Value::String(parent_id.clone()));
    metadata.insert("chunk_index".to_string(), Value::from(index));
    metadata.insert("total_chunks".to_string(), Value::from(total));

    Row {
        source_path: parent.source_path.clone(),
        source_name: parent.source_name.clone(),
        file_type: parent.file_type.clone(),
        unit_type: Some(UnitType::Chunk.as_str().to_string()),
        unit_id: Some(format!("{}:{}", parent_id, index)),
        content: Some(text.to_string()),
        char_count: Some(text.chars().count() as u64),
        metadata: Some(metadata),
        status: Some("ok".to_string()),
        error: None,
    }
}

/// Split every successful row of `table` into chunks of at most `max_characters`.
///
/// # Errors
///
/// Returns `Validation` when `max_characters` is zero or `overlap` is not smaller
/// than `max_characters`.
pub fn chunk_table(table: &Table, max_characters: usize, overlap: usize) -> Result<Table> {
    let splitter = TextSplitter::new(build_chunk_config(max_characters, overlap)?);
    let mut out = Table::empty();

    for row in table.rows() {
        let content = row.content.as_deref().unwrap_or_default();
        if row.status.as_deref() != Some("ok") || content.trim().is_empty() {
            out.push(row.clone());
            continue;
        }

        let chunks: Vec<&str> = splitter.chunks(content).collect();
        let total = chunks.len();
        for (index, text) in chunks.into_iter().enumerate() {
            out.push(chunk_row(row, index, total, text));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;
    use std::path::Path;

    fn table_of(units: Vec<Unit>) -> Table {
        Table::from_units(&units)
    }

    #[test]
    fn test_short_content_is_single_chunk() {
        let table = table_of(vec![
            Unit::ok(Path::new("a.md"), "md", UnitType::Block, "3", "Short text.").with_metadata("block_type", "paragraph"),
        ]);
        let chunked = chunk_table(&table, 100, 0).unwrap();
        assert_eq!(chunked.len(), 1);
        let row = &chunked.rows()[0];
        assert_eq!(row.unit_type.as_deref(), Some("chunk"));
        assert_eq!(row.unit_id.as_deref(), Some("3:0"));
        assert_eq!(row.content.as_deref(), Some("Short text."));
        assert_eq!(row.metadata_value("parent_unit_type"), Some(&Value::from("block")));
        assert_eq!(row.metadata_value("block_type"), Some(&Value::from("paragraph")));
    }

    #[test]
    fn test_long_content_respects_capacity() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(30);
        let table = table_of(vec![Unit::ok(Path::new("a.txt"), "txt", UnitType::File, "0", text)]);
        let chunked = chunk_table(&table, 120, 20).unwrap();
        assert!(chunked.len() > 1);
        for row in chunked.rows() {
            assert!(row.char_count.unwrap() <= 120);
            assert_eq!(row.metadata_value("total_chunks"), Some(&Value::from(chunked.len())));
        }
    }

    #[test]
    fn test_error_and_empty_rows_pass_through() {
        let table = table_of(vec![
            Unit::error(Path::new("a.txt"), "txt", UnitType::File, "body", "boom"),
            Unit::ok(Path::new("b.txt"), "txt", UnitType::File, "0", ""),
        ]);
        let chunked = chunk_table(&table, 50, 0).unwrap();
        assert_eq!(chunked.rows(), table.rows());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_capacity() {
        let table = Table::empty();
        assert!(matches!(
            chunk_table(&table, 10, 10).unwrap_err(),
            UnifileError::Validation { .. }
        ));
        assert!(chunk_table(&table, 0, 0).is_err());
    }
}
