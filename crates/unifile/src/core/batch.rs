//! Concurrent batch extraction.
//!
//! Every path gets its own task; the blocking dispatch itself runs on tokio's
//! blocking pool so slow parsers never stall the scheduler. Concurrency is capped
//! by a semaphore (`max_concurrent_extractions`, default `num_cpus * 2`). Results
//! come back in input order, one table per path, and a failing or panicking path
//! yields a single error row instead of aborting the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Semaphore;

use crate::core::config::RuntimeOptions;
use crate::core::dispatch::{Dispatcher, ExtractionInput};
use crate::manifest::Manifest;
use crate::plugins::path_extension;
use crate::table::Table;
use crate::types::{Unit, UnitType};
use crate::{Result, UnifileError};

static GLOBAL_RUNTIME: Lazy<std::io::Result<tokio::runtime::Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("unifile-batch")
        .enable_all()
        .build()
});

fn error_table(path: &Path, err: &UnifileError) -> Table {
    Table::from_units(&[Unit::file_failure(path, path_extension(path).unwrap_or_default(), err)])
}

fn panic_table(path: &Path, detail: &str) -> Table {
    Table::from_units(&[Unit::error(
        path,
        path_extension(path).unwrap_or_default(),
        UnitType::File,
        "body",
        format!("Extraction task failed: {}", detail),
    )
    .with_metadata("exception", "panic")])
}

impl Dispatcher {
    /// Extract many paths concurrently, preserving input order.
    ///
    /// The snapshot is resolved once for the whole batch, so every path sees the
    /// same configuration even if the overlay changes mid-batch.
    ///
    /// # Errors
    ///
    /// Only call-level problems (invalid options, a poisoned lock) return `Err`.
    /// Per-path failures become single-row error tables.
    #[tracing::instrument(skip_all, fields(count = paths.len()))]
    pub async fn extract_many<P: AsRef<Path>>(
        &self,
        paths: Vec<P>,
        options: &RuntimeOptions,
        manifest: Option<Arc<Manifest>>,
    ) -> Result<Vec<Table>> {
        if paths.is_empty() {
            return Ok(vec![]);
        }

        let config = Arc::new(self.resolve_config(options)?);
        let max_concurrent = config.max_concurrent_extractions.unwrap_or_else(|| num_cpus::get() * 2);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            let path_buf: PathBuf = path.as_ref().to_path_buf();
            let dispatcher = self.clone();
            let config = Arc::clone(&config);
            let manifest = manifest.clone();
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return panic_table(&path_buf, &e.to_string()),
                };

                let task_path = path_buf.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    dispatcher.extract_resolved(ExtractionInput::Path(task_path), &config, manifest.as_deref())
                })
                .await;

                match outcome {
                    Ok(Ok(units)) => Table::from_units(&units),
                    Ok(Err(e)) => {
                        tracing::warn!(path = %path_buf.display(), error = %e, "Batch item failed");
                        error_table(&path_buf, &e)
                    }
                    Err(join_err) => panic_table(&path_buf, &join_err.to_string()),
                }
            }));
        }

        let total = handles.len();
        let mut tables = Vec::with_capacity(total);
        let mut failed = 0usize;
        for handle in handles {
            let table = match handle.await {
                Ok(table) => table,
                Err(join_err) => Table::from_units(&[Unit::error(
                    Path::new(""),
                    "",
                    UnitType::File,
                    "body",
                    format!("Extraction task failed: {}", join_err),
                )]),
            };
            if !table.all_ok() {
                failed += 1;
            }
            tables.push(table);
        }

        tracing::info!(total, failed, "Batch extraction finished");
        Ok(tables)
    }
}

/// Extract many paths concurrently through the process-wide dispatcher.
///
/// # Example
///
/// ```rust,no_run
/// use unifile::{extract_many, RuntimeOptions};
///
/// # async fn example() -> unifile::Result<()> {
/// let tables = extract_many(vec!["a.txt", "b.json", "c.csv"], &RuntimeOptions::default(), None).await?;
/// assert_eq!(tables.len(), 3);
/// # Ok(())
/// # }
/// ```
pub async fn extract_many<P: AsRef<Path>>(
    paths: Vec<P>,
    options: &RuntimeOptions,
    manifest: Option<Arc<Manifest>>,
) -> Result<Vec<Table>> {
    Dispatcher::global().extract_many(paths, options, manifest).await
}

/// Synchronous wrapper for [`extract_many`] on a shared runtime.
///
/// Must not be called from inside an async context.
pub fn extract_many_sync<P: AsRef<Path>>(
    paths: Vec<P>,
    options: &RuntimeOptions,
    manifest: Option<Arc<Manifest>>,
) -> Result<Vec<Table>> {
    let runtime = GLOBAL_RUNTIME
        .as_ref()
        .map_err(|e| UnifileError::Other(format!("Failed to start batch runtime: {}", e)))?;
    runtime.block_on(extract_many(paths, options, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::ExtractionContext;
    use crate::plugins::{Extractor, ExtractorRegistry, extractor_factory};
    use std::time::Duration;
    use tempfile::tempdir;

    struct Sleepy;

    impl Extractor for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
            let millis: u64 = std::fs::read_to_string(path)?.trim().parse().unwrap_or(0);
            std::thread::sleep(Duration::from_millis(millis));
            Ok(vec![Unit::ok(path, "slow", UnitType::File, "0", format!("slept {}", millis))])
        }
    }

    struct Panicky;

    impl Extractor for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn extract(&self, _path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
            panic!("extractor blew up");
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ExtractorRegistry::new();
        registry.register("slow", extractor_factory(|| Sleepy)).unwrap();
        registry.register("boom", extractor_factory(|| Panicky)).unwrap();
        Dispatcher::with_registry(registry)
    }

    #[tokio::test]
    async fn test_order_matches_input_not_completion() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.slow");
        let b = dir.path().join("b.slow");
        let c = dir.path().join("c.slow");
        std::fs::write(&a, "10").unwrap();
        std::fs::write(&b, "300").unwrap();
        std::fs::write(&c, "0").unwrap();

        let tables = dispatcher()
            .extract_many(vec![&a, &b, &c], &RuntimeOptions::default(), None)
            .await
            .unwrap();

        let names: Vec<_> = tables
            .iter()
            .map(|t| t.rows()[0].source_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["a.slow", "b.slow", "c.slow"]);
    }

    #[tokio::test]
    async fn test_per_path_failures_become_error_tables() {
        let dir = tempdir().unwrap();
        let ok = dir.path().join("ok.slow");
        let boom = dir.path().join("x.boom");
        let unknown = dir.path().join("y.qqq");
        std::fs::write(&ok, "0").unwrap();
        std::fs::write(&boom, "").unwrap();
        std::fs::write(&unknown, "").unwrap();
        let missing = dir.path().join("missing.slow");

        let tables = dispatcher()
            .extract_many(vec![&ok, &boom, &unknown, &missing], &RuntimeOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(tables.len(), 4);
        assert!(tables[0].all_ok());
        for (table, name) in tables[1..].iter().zip(["x.boom", "y.qqq", "missing.slow"]) {
            assert_eq!(table.len(), 1);
            let row = &table.rows()[0];
            assert_eq!(row.status.as_deref(), Some("error"));
            assert_eq!(row.source_name.as_deref(), Some(name));
            assert!(row.error.as_deref().is_some_and(|e| !e.is_empty()));
        }
        assert_eq!(tables[1].rows()[0].metadata_value("exception"), Some(&serde_json::json!("panic")));
        assert_eq!(
            tables[2].rows()[0].metadata_value("exception"),
            Some(&serde_json::json!("unsupported_type"))
        );
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
    async fn test_concurrency_limit_of_one_still_completes() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| {
                let p = dir.path().join(format!("{}.slow", i));
                std::fs::write(&p, "5").unwrap();
                p
            })
            .collect();
        let options = RuntimeOptions {
            max_concurrent_extractions: Some(1),
            ..Default::default()
        };

        let tables = dispatcher().extract_many(paths, &options, None).await.unwrap();
        assert_eq!(tables.len(), 5);
        assert!(tables.iter().all(Table::all_ok));
    }
}
