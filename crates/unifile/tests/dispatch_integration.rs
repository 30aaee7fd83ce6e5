//! End-to-end dispatch through the built-in extractors.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;
use unifile::core::dispatch::{Dispatcher, ExtractionInput};
use unifile::plugins::ExtractorRegistry;
use unifile::{CANONICAL_COLUMNS, RuntimeOptions, UnifileError};

fn dispatcher() -> Dispatcher {
    Dispatcher::with_registry(ExtractorRegistry::with_defaults())
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_markdown_becomes_typed_blocks() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "notes.md", "# Title\n\nFirst paragraph.\n\n- item one\n");

    let table = dispatcher()
        .extract_to_table(path.as_path(), &RuntimeOptions::default(), None)
        .unwrap();

    assert_eq!(table.columns(), &CANONICAL_COLUMNS);
    assert_eq!(table.len(), 3);
    let kinds: Vec<_> = table
        .rows()
        .iter()
        .map(|r| r.metadata_value("block_type").and_then(Value::as_str).unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["heading", "paragraph", "list_item"]);

    let first = &table.rows()[0];
    assert_eq!(first.content.as_deref(), Some("Title"));
    assert_eq!(first.file_type.as_deref(), Some("md"));
    assert_eq!(first.source_name.as_deref(), Some("notes.md"));
    assert_eq!(first.status.as_deref(), Some("ok"));
    assert!(first.error.is_none());
    assert!(first.metadata_value("size_bytes").is_some());
}

#[test]
fn test_call_options_reach_the_extractor() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "notes.txt", "# Title\n\nbody\n");

    let options = RuntimeOptions {
        enable_block_types: Some(false),
        ..Default::default()
    };
    let table = dispatcher().extract_to_table(path.as_path(), &options, None).unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|r| r.metadata_value("block_type").is_none()));
}

#[test]
fn test_csv_table_and_cell_modes() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "people.csv", "name,age\nAda,36\n");

    let tables = dispatcher()
        .extract_to_table(path.as_path(), &RuntimeOptions::default(), None)
        .unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables.rows()[0].unit_type.as_deref(), Some("table"));
    assert_eq!(tables.rows()[0].content.as_deref(), Some("name\tage\nAda\t36"));

    let cells = RuntimeOptions {
        table_cells: Some(true),
        ..Default::default()
    };
    let table = dispatcher().extract_to_table(path.as_path(), &cells, None).unwrap();
    let ids: Vec<_> = table.rows().iter().filter_map(|r| r.unit_id.clone()).collect();
    assert!(ids.contains(&"0,0".to_string()));
    assert!(ids.contains(&"1,1".to_string()));
    assert!(table.rows().iter().all(|r| r.unit_type.as_deref() == Some("cell")));
}

#[test]
fn test_bytes_input_uses_filename_extension() {
    let input = ExtractionInput::bytes(br#"{"user": {"name": "Ada"}}"#.to_vec(), "payload.json");
    let table = dispatcher()
        .extract_to_table(input, &RuntimeOptions::default(), None)
        .unwrap();

    assert_eq!(table.len(), 1);
    let row = &table.rows()[0];
    assert_eq!(row.file_type.as_deref(), Some("json"));
    assert_eq!(row.source_name.as_deref(), Some("payload.json"));
    assert!(row.content.as_deref().unwrap().contains("user.name=Ada"));
}

#[test]
fn test_unsupported_extension_lists_supported() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "archive.xyz", "data");

    let err = dispatcher()
        .extract_to_table(path.as_path(), &RuntimeOptions::default(), None)
        .unwrap_err();
    match err {
        UnifileError::UnsupportedType { extension, supported } => {
            assert_eq!(extension, "xyz");
            assert!(supported.contains(&"txt".to_string()));
        }
        other => panic!("expected UnsupportedType, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_not_found() {
    let err = dispatcher()
        .extract_to_table(Path::new("/definitely/not/here.txt"), &RuntimeOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, UnifileError::NotFound { .. }));
}

#[test]
fn test_invalid_options_rejected_before_extraction() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "a.txt", "hello");

    let options = RuntimeOptions {
        media_chunk_seconds: Some(0),
        ..Default::default()
    };
    let err = dispatcher().extract_to_table(path.as_path(), &options, None).unwrap_err();
    assert!(matches!(err, UnifileError::Validation { .. }));
}

#[test]
fn test_content_failure_is_a_row_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.csv", "a,\"unterminated\n");

    let table = dispatcher()
        .extract_to_table(path.as_path(), &RuntimeOptions::default(), None)
        .unwrap();
    assert_eq!(table.len(), 1);
    let row = &table.rows()[0];
    assert_eq!(row.status.as_deref(), Some("error"));
    assert_eq!(row.content.as_deref(), Some(""));
    assert!(row.error.as_deref().unwrap().contains("Unterminated"));
    assert_eq!(row.metadata_value("exception"), Some(&Value::from("parsing")));
}

#[test]
fn test_dummy_media_backend_segments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clip.wav");
    fs::write(&path, vec![0u8; 16000 * 65]).unwrap();

    let options = RuntimeOptions {
        asr_backend: Some("dummy".to_string()),
        media_chunk_seconds: Some(30),
        ..Default::default()
    };
    let table = dispatcher().extract_to_table(path.as_path(), &options, None).unwrap();

    assert_eq!(table.rows()[0].unit_type.as_deref(), Some("audio"));
    let segments: Vec<_> = table
        .rows()
        .iter()
        .filter(|r| r.unit_type.as_deref() == Some("segment"))
        .collect();
    assert_eq!(segments.len(), 3);
}
