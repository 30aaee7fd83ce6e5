//! Concurrent batch extraction.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use unifile::core::dispatch::Dispatcher;
use unifile::manifest::Manifest;
use unifile::plugins::ExtractorRegistry;
use unifile::RuntimeOptions;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dispatcher() -> Dispatcher {
    Dispatcher::with_registry(ExtractorRegistry::with_defaults())
}

fn fixtures(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("doc_{i}.txt"));
            fs::write(&path, format!("Document number {i}.")).unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_batch_preserves_input_order() {
    let dir = TempDir::new().unwrap();
    let paths = fixtures(&dir, 12);

    let options = RuntimeOptions {
        max_concurrent_extractions: Some(3),
        ..Default::default()
    };
    let tables = dispatcher().extract_many(paths.clone(), &options, None).await.unwrap();

    assert_eq!(tables.len(), paths.len());
    for (i, table) in tables.iter().enumerate() {
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].content.as_deref(), Some(format!("Document number {i}.").as_str()));
    }
}

#[tokio::test]
async fn test_per_path_failures_become_error_tables() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.txt");
    fs::write(&good, "fine").unwrap();
    let unsupported = dir.path().join("blob.xyz");
    fs::write(&unsupported, "x").unwrap();
    let missing = dir.path().join("missing.txt");

    let tables = dispatcher()
        .extract_many(vec![good, unsupported, missing], &RuntimeOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(tables.len(), 3);
    assert!(tables[0].all_ok());

    let row = &tables[1].rows()[0];
    assert_eq!(row.status.as_deref(), Some("error"));
    assert_eq!(row.metadata_value("exception"), Some(&serde_json::Value::from("unsupported_type")));

    let row = &tables[2].rows()[0];
    assert_eq!(row.status.as_deref(), Some("error"));
    assert_eq!(row.metadata_value("exception"), Some(&serde_json::Value::from("not_found")));
}

#[tokio::test]
async fn test_invalid_options_fail_the_whole_call() {
    let dir = TempDir::new().unwrap();
    let paths = fixtures(&dir, 2);
    let options = RuntimeOptions {
        max_concurrent_extractions: Some(0),
        ..Default::default()
    };
    assert!(dispatcher().extract_many(paths, &options, None).await.is_err());
}

#[tokio::test]
async fn test_empty_batch() {
    let tables = dispatcher()
        .extract_many(Vec::<PathBuf>::new(), &RuntimeOptions::default(), None)
        .await
        .unwrap();
    assert!(tables.is_empty());
}

#[tokio::test]
async fn test_batch_shares_manifest() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "unique a").unwrap();
    fs::write(&b, "unique b").unwrap();
    let manifest = Arc::new(Manifest::open(dir.path().join("manifest.jsonl")).unwrap());

    let first = dispatcher()
        .extract_many(vec![a.clone(), b.clone()], &RuntimeOptions::default(), Some(Arc::clone(&manifest)))
        .await
        .unwrap();
    assert!(first.iter().all(|t| t.len() == 1));

    let second = dispatcher()
        .extract_many(vec![a, b], &RuntimeOptions::default(), Some(manifest))
        .await
        .unwrap();
    assert!(second.iter().all(|t| t.is_empty()));
}

#[tokio::test]
async fn test_identical_files_extracted_once_under_concurrency() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..16)
        .map(|i| {
            let path = dir.path().join(format!("copy_{i}.txt"));
            fs::write(&path, "the same body everywhere").unwrap();
            path
        })
        .collect();
    let log = dir.path().join("manifest.jsonl");
    let manifest = Arc::new(Manifest::open(&log).unwrap());
    let options = RuntimeOptions {
        max_concurrent_extractions: Some(8),
        ..Default::default()
    };

    let tables = dispatcher().extract_many(paths, &options, Some(manifest)).await.unwrap();

    assert_eq!(tables.iter().filter(|t| !t.is_empty()).count(), 1);
    let entries = unifile::manifest::read_entries(&log).unwrap();
    assert_eq!(entries.len(), 16);
    assert_eq!(
        entries.iter().filter(|e| e.status == unifile::manifest::ManifestStatus::Ok).count(),
        1
    );
}

#[test]
fn test_sync_wrapper() {
    let dir = TempDir::new().unwrap();
    let paths = fixtures(&dir, 2);
    let tables = unifile::extract_many_sync(paths, &RuntimeOptions::default(), None).unwrap();
    assert_eq!(tables.len(), 2);
    assert!(tables.iter().all(|t| t.all_ok()));
}
