//! Dispatcher: the single entry point turning an input into a normalized table.
//!
//! One dispatch runs these steps:
//!
//! 1. Resolve a configuration snapshot (call options over the runtime overlay).
//! 2. Materialize the input as a path (bytes go to a scratch file).
//! 3. Resolve the extension through the registry, or fail with `UnsupportedType`
//!    before any extractor is constructed.
//! 4. Consult the manifest, if any; duplicates short-circuit to an empty table.
//! 5. Build a fresh extractor, hand it the options it declared, run it.
//! 6. Enrich units with file metadata, record the outcome, normalize to a table.
//!
//! Archive extractors re-enter step 5 for their members through
//! [`ExtractionContext::dispatch_nested`], carrying the same snapshot and an
//! incremented depth.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::core::config::{ExtractionConfig, RuntimeOptions};
use crate::core::io::{validate_regular_file, write_scratch_file};
use crate::core::metadata::sniff_file_metadata;
use crate::core::overlay::{RuntimeOverlay, publish_env};
use crate::manifest::{Manifest, ManifestStatus};
use crate::plugins::{ExtractorFactory, ExtractorRegistry, get_extractor_registry};
use crate::table::Table;
use crate::types::Unit;
use crate::{Result, UnifileError};

/// What to extract: a file on disk, or raw bytes with a filename hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionInput {
    Path(PathBuf),
    /// The filename's extension selects the extractor.
    Bytes { data: Vec<u8>, filename: String },
}

impl ExtractionInput {
    pub fn bytes(data: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: filename.into(),
        }
    }
}

impl From<PathBuf> for ExtractionInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ExtractionInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&PathBuf> for ExtractionInput {
    fn from(path: &PathBuf) -> Self {
        Self::Path(path.clone())
    }
}

impl From<&str> for ExtractionInput {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// Per-call state handed to an extractor.
///
/// Carries the resolved snapshot by reference and the archive recursion depth, and
/// lets container extractors dispatch their members.
pub struct ExtractionContext<'a> {
    dispatcher: &'a Dispatcher,
    config: &'a ExtractionConfig,
    depth: usize,
}

impl<'a> ExtractionContext<'a> {
    pub fn config(&self) -> &ExtractionConfig {
        self.config
    }

    /// Number of archive levels above the file being extracted.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Environment for helper processes spawned by this extraction.
    pub fn env_vars(&self) -> Vec<(&'static str, Option<String>)> {
        self.config.env_vars(self.depth)
    }

    /// Extension the registry would use for `path`, if any.
    pub fn resolve(&self, path: &Path) -> Result<Option<String>> {
        self.dispatcher.resolve(path)
    }

    /// Dispatch a nested file (an archive member) one level deeper.
    ///
    /// Uses the same snapshot as the current call. Nested files never consult a manifest.
    pub fn dispatch_nested(&self, path: &Path) -> Result<Vec<Unit>> {
        validate_regular_file(path)?;
        let extension = self.dispatcher.require_extension(path)?;
        self.dispatcher.run(path, &extension, self.config, self.depth + 1)
    }
}

/// Resolves inputs to extractors and normalizes their output.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<RwLock<ExtractorRegistry>>,
    overlay: Arc<RuntimeOverlay>,
    publish_env: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("publish_env", &self.publish_env)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::global()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<RwLock<ExtractorRegistry>>, overlay: Arc<RuntimeOverlay>) -> Self {
        Self {
            registry,
            overlay,
            publish_env: true,
        }
    }

    /// Dispatcher over the process-wide registry and overlay.
    pub fn global() -> Self {
        Self::new(get_extractor_registry(), RuntimeOverlay::global())
    }

    /// Dispatcher over a private registry and a default overlay.
    ///
    /// Does not touch the process environment.
    pub fn with_registry(registry: ExtractorRegistry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            overlay: Arc::new(RuntimeOverlay::new()),
            publish_env: false,
        }
    }

    /// Toggle mirroring of each snapshot into the process environment.
    pub fn publish_env(mut self, enabled: bool) -> Self {
        self.publish_env = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<RwLock<ExtractorRegistry>> {
        &self.registry
    }

    pub fn overlay(&self) -> &Arc<RuntimeOverlay> {
        &self.overlay
    }

    fn read_registry(&self) -> Result<std::sync::RwLockReadGuard<'_, ExtractorRegistry>> {
        self.registry
            .read()
            .map_err(|e| UnifileError::LockPoisoned(format!("Extractor registry lock poisoned: {}", e)))
    }

    pub fn resolve(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.read_registry()?.resolve(path))
    }

    pub fn supported_extensions(&self) -> Result<Vec<String>> {
        Ok(self.read_registry()?.supported_extensions())
    }

    fn require_extension(&self, path: &Path) -> Result<String> {
        let registry = self.read_registry()?;
        registry.resolve(path).ok_or_else(|| UnifileError::UnsupportedType {
            extension: crate::plugins::path_extension(path).unwrap_or_default(),
            supported: registry.supported_extensions(),
        })
    }

    fn factory(&self, extension: &str) -> Result<ExtractorFactory> {
        self.read_registry()?
            .factory(extension)
            .ok_or_else(|| UnifileError::Other(format!("No factory registered for '{}'", extension)))
    }

    /// Extract `input` into the canonical table.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a path input is missing or not a regular file
    /// - `UnsupportedType` if no extractor handles the extension
    /// - `Validation` if the resolved options are invalid or a byte input lacks a filename
    /// - any `Err` an extractor returns for a contract violation
    pub fn extract_to_table(
        &self,
        input: impl Into<ExtractionInput>,
        options: &RuntimeOptions,
        manifest: Option<&Manifest>,
    ) -> Result<Table> {
        let units = self.extract_units(input, options, manifest)?;
        Ok(Table::from_units(&units))
    }

    /// Like [`extract_to_table`](Self::extract_to_table) but returns the units.
    pub fn extract_units(
        &self,
        input: impl Into<ExtractionInput>,
        options: &RuntimeOptions,
        manifest: Option<&Manifest>,
    ) -> Result<Vec<Unit>> {
        let config = self.resolve_config(options)?;
        self.extract_resolved(input.into(), &config, manifest)
    }

    /// Resolve a snapshot for `options` and mirror it into the environment.
    pub(crate) fn resolve_config(&self, options: &RuntimeOptions) -> Result<ExtractionConfig> {
        let config = self.overlay.resolve(options)?;
        if self.publish_env {
            publish_env(&config, 0)?;
        }
        Ok(config)
    }

    /// Run one top-level dispatch with an already-resolved snapshot.
    pub(crate) fn extract_resolved(
        &self,
        input: ExtractionInput,
        config: &ExtractionConfig,
        manifest: Option<&Manifest>,
    ) -> Result<Vec<Unit>> {
        // Keeps a byte input's scratch file alive for the rest of the call.
        let (_scratch, path) = match input {
            ExtractionInput::Path(path) => {
                validate_regular_file(&path)?;
                (None, path)
            }
            ExtractionInput::Bytes { data, filename } => {
                let (dir, path) = write_scratch_file(&data, &filename)?;
                (Some(dir), path)
            }
        };

        let extension = self.require_extension(&path)?;

        let claim = match manifest {
            Some(manifest) => {
                let claim = manifest.claim(&path)?;
                if claim.is_duplicate {
                    tracing::debug!(path = %path.display(), hash = %claim.hash, "Skipping duplicate content");
                    manifest.record(&path, ManifestStatus::Duplicate)?;
                    return Ok(Vec::new());
                }
                Some(claim)
            }
            None => None,
        };

        let units = match self.run(&path, &extension, config, 0) {
            Ok(units) => units,
            Err(e) => {
                if let (Some(manifest), Some(claim)) = (manifest, claim) {
                    manifest.release(&claim.hash)?;
                }
                return Err(e);
            }
        };

        if let Some(manifest) = manifest {
            let status = if units.iter().all(Unit::is_ok) {
                ManifestStatus::Ok
            } else {
                ManifestStatus::Error
            };
            manifest.record(&path, status)?;
        }

        Ok(units)
    }

    /// Dispatch an already-validated path with an explicit snapshot and depth.
    ///
    /// Skips the manifest and the environment mirror. Used by batch workers and
    /// nested archive members.
    pub fn dispatch_with_config(&self, path: &Path, config: &ExtractionConfig, depth: usize) -> Result<Vec<Unit>> {
        validate_regular_file(path)?;
        let extension = self.require_extension(path)?;
        self.run(path, &extension, config, depth)
    }

    pub(crate) fn run(&self, path: &Path, extension: &str, config: &ExtractionConfig, depth: usize) -> Result<Vec<Unit>> {
        let factory = self.factory(extension)?;
        let mut extractor = factory();
        let settings = config.settings_for(extractor.accepted_options());
        extractor.configure(&settings);

        tracing::debug!(
            path = %path.display(),
            extension = %extension,
            extractor = %extractor.name(),
            depth,
            "Dispatching"
        );

        let ctx = ExtractionContext {
            dispatcher: self,
            config,
            depth,
        };
        let mut units = extractor.extract(path, &ctx)?;

        let sniffed = sniff_file_metadata(path, config.metadata_mode);
        for unit in &mut units {
            unit.fill_file_type(extension);
            for (key, value) in &sniffed {
                unit.insert_metadata_if_absent(key, value.clone());
            }
        }

        Ok(units)
    }
}

/// Extract one input through the process-wide dispatcher.
///
/// # Example
///
/// ```rust,no_run
/// use unifile::{extract_to_table, RuntimeOptions};
///
/// let table = extract_to_table("notes.md", &RuntimeOptions::default())?;
/// for row in table.rows() {
///     println!("{:?} {:?}", row.unit_id, row.content);
/// }
/// # Ok::<(), unifile::UnifileError>(())
/// ```
pub fn extract_to_table(input: impl Into<ExtractionInput>, options: &RuntimeOptions) -> Result<Table> {
    Dispatcher::global().extract_to_table(input, options, None)
}

/// Extract one input, consulting and updating `manifest`.
pub fn extract_to_table_with_manifest(
    input: impl Into<ExtractionInput>,
    options: &RuntimeOptions,
    manifest: &Manifest,
) -> Result<Table> {
    Dispatcher::global().extract_to_table(input, options, Some(manifest))
}
