//! Process-wide runtime configuration overlay.
//!
//! The overlay holds the "previously set" layer of configuration and mirrors it into
//! `UNIFILE_*` environment variables for helper binaries that can only read their
//! environment. Precedence when resolving a snapshot, highest first:
//!
//! 1. explicit options passed to the call
//! 2. values stored with [`RuntimeOverlay::set`]
//! 3. process environment at first use
//! 4. a discovered `unifile.{toml,yaml,yml,json}` file
//! 5. built-in defaults
//!
//! Dispatch never reads configuration back from shared state once a snapshot is
//! resolved: the [`ExtractionConfig`] value travels with the call. Only the
//! environment mirror is global, and writes to it are serialized.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, RwLock};

use crate::core::config::{ExtractionConfig, RuntimeOptions, env_keys};
use crate::{Result, UnifileError};

/// Serializes every write to the process environment.
static ENV_MIRROR_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

static GLOBAL_OVERLAY: Lazy<Arc<RuntimeOverlay>> = Lazy::new(|| Arc::new(RuntimeOverlay::load()));

/// Layered, mergeable process-wide extraction options.
#[derive(Debug)]
pub struct RuntimeOverlay {
    base: ExtractionConfig,
    current: RwLock<ExtractionConfig>,
}

impl RuntimeOverlay {
    /// Overlay seeded from built-in defaults only.
    pub fn new() -> Self {
        Self::with_base(ExtractionConfig::default())
    }

    pub fn with_base(base: ExtractionConfig) -> Self {
        Self {
            current: RwLock::new(base.clone()),
            base,
        }
    }

    /// Overlay seeded from defaults, then a discovered config file, then the environment.
    ///
    /// An unreadable or malformed persisted file is logged and skipped.
    pub fn load() -> Self {
        let mut layers = RuntimeOptions::new();
        match RuntimeOptions::discover() {
            Ok(Some(persisted)) => layers.merge(&persisted),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring persisted configuration"),
        }
        layers.merge(&RuntimeOptions::from_env());

        let base = ExtractionConfig::default().with_overrides(&layers);
        match base.validate() {
            Ok(()) => Self::with_base(base),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted/environment configuration invalid, using defaults");
                Self::new()
            }
        }
    }

    /// The shared process-wide overlay.
    pub fn global() -> Arc<RuntimeOverlay> {
        Arc::clone(&GLOBAL_OVERLAY)
    }

    /// Merge the non-`None` fields of `options` into the stored layer and
    /// re-publish the full merged set to the environment.
    ///
    /// # Errors
    ///
    /// Returns `UnifileError::Validation` if the merged result is invalid; the
    /// stored layer is left unchanged in that case.
    pub fn set(&self, options: &RuntimeOptions) -> Result<ExtractionConfig> {
        let updated = {
            let mut current = self
                .current
                .write()
                .map_err(|e| UnifileError::LockPoisoned(format!("Runtime overlay lock poisoned: {}", e)))?;
            let candidate = current.with_overrides(options);
            candidate.validate()?;
            *current = candidate.clone();
            candidate
        };
        publish_env(&updated, 0)?;
        Ok(updated)
    }

    /// Snapshot of the stored layer.
    pub fn current(&self) -> Result<ExtractionConfig> {
        self.current
            .read()
            .map(|c| c.clone())
            .map_err(|e| UnifileError::LockPoisoned(format!("Runtime overlay lock poisoned: {}", e)))
    }

    /// Resolve a per-call snapshot: explicit `options` over the stored layer.
    ///
    /// The stored layer is not modified.
    pub fn resolve(&self, options: &RuntimeOptions) -> Result<ExtractionConfig> {
        let snapshot = self.current()?.with_overrides(options);
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Discard every value stored with [`set`](Self::set).
    ///
    /// The layer returns to what the overlay was created with. For the global
    /// overlay that is the defaults, the persisted file and the environment read at
    /// first use, not the bare defaults.
    pub fn reset(&self) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| UnifileError::LockPoisoned(format!("Runtime overlay lock poisoned: {}", e)))?;
        *current = self.base.clone();
        Ok(())
    }
}

impl Default for RuntimeOverlay {
    fn default() -> Self {
        Self::new()
    }
}

/// Update the process-wide overlay. See [`RuntimeOverlay::set`].
pub fn set_runtime_options(options: &RuntimeOptions) -> Result<ExtractionConfig> {
    GLOBAL_OVERLAY.set(options)
}

/// Write a snapshot into the process environment.
///
/// Writes are serialized across threads; unset optional values are removed.
pub fn publish_env(config: &ExtractionConfig, depth: usize) -> Result<()> {
    let _guard = ENV_MIRROR_LOCK
        .lock()
        .map_err(|e| UnifileError::LockPoisoned(format!("Environment mirror lock poisoned: {}", e)))?;

    for (key, value) in config.env_vars(depth) {
        debug_assert!(env_keys::ALL.contains(&key));
        write_env(key, value.as_deref());
    }
    Ok(())
}

#[allow(unsafe_code)]
fn write_env(key: &str, value: Option<&str>) {
    // SAFETY: every mutation of the UNIFILE_* variables goes through
    // ENV_MIRROR_LOCK, and the crate never reads them back during a dispatch.
    unsafe {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MetadataMode;
    use serial_test::serial;

    #[test]
    fn test_set_merges_only_non_null_fields() {
        let overlay = RuntimeOverlay::new();
        overlay
            .set(&RuntimeOptions {
                ocr_language: Some("deu".to_string()),
                ..Default::default()
            })
            .unwrap();
        overlay
            .set(&RuntimeOptions {
                enable_tables: Some(false),
                ..Default::default()
            })
            .unwrap();

        let current = overlay.current().unwrap();
        assert_eq!(current.ocr_language, "deu");
        assert!(!current.enable_tables);
        assert!(current.enable_block_types);
    }

    #[test]
    fn test_resolve_does_not_modify_stored_layer() {
        let overlay = RuntimeOverlay::new();
        let snapshot = overlay
            .resolve(&RuntimeOptions {
                metadata_mode: Some(MetadataMode::Full),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(snapshot.metadata_mode, MetadataMode::Full);
        assert_eq!(overlay.current().unwrap().metadata_mode, MetadataMode::Basic);
    }

    #[test]
    fn test_invalid_set_leaves_layer_unchanged() {
        let overlay = RuntimeOverlay::new();
        let result = overlay.set(&RuntimeOptions {
            media_chunk_seconds: Some(0),
            ocr_language: Some("fra".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(overlay.current().unwrap().ocr_language, "eng");
    }

    #[test]
    fn test_reset_restores_base() {
        let overlay = RuntimeOverlay::new();
        overlay
            .set(&RuntimeOptions {
                table_cells: Some(true),
                ..Default::default()
            })
            .unwrap();
        overlay.reset().unwrap();
        assert!(!overlay.current().unwrap().table_cells);
    }

    #[test]
    #[serial]
    fn test_reset_keeps_startup_layer() {
        let base = ExtractionConfig::default().with_overrides(&RuntimeOptions {
            ocr_language: Some("fra".to_string()),
            ..Default::default()
        });
        let overlay = RuntimeOverlay::with_base(base);
        overlay
            .set(&RuntimeOptions {
                ocr_language: Some("deu".to_string()),
                ..Default::default()
            })
            .unwrap();

        overlay.reset().unwrap();
        assert_eq!(overlay.current().unwrap().ocr_language, "fra");
    }

    #[test]
    #[serial]
    fn test_set_publishes_full_merged_set() {
        let overlay = RuntimeOverlay::new();
        overlay
            .set(&RuntimeOptions {
                asr_model: Some("small".to_string()),
                disable_ocr: Some(true),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(std::env::var(env_keys::ASR_MODEL).unwrap(), "small");
        assert_eq!(std::env::var(env_keys::DISABLE_OCR).unwrap(), "1");
        assert_eq!(std::env::var(env_keys::OCR_LANG).unwrap(), "eng");
        assert_eq!(std::env::var(env_keys::ARCHIVE_DEPTH).unwrap(), "0");
    }

    #[test]
    #[serial]
    fn test_publish_env_removes_unset_optionals() {
        let with_device = ExtractionConfig {
            asr_device: Some("cuda".to_string()),
            ..Default::default()
        };
        publish_env(&with_device, 0).unwrap();
        assert_eq!(std::env::var(env_keys::ASR_DEVICE).unwrap(), "cuda");

        publish_env(&ExtractionConfig::default(), 1).unwrap();
        assert!(std::env::var(env_keys::ASR_DEVICE).is_err());
        assert_eq!(std::env::var(env_keys::ARCHIVE_DEPTH).unwrap(), "1");
    }
}
