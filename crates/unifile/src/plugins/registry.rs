//! Extension-to-factory registry.
//!
//! The registry is additive: entries are added at startup by the built-in set and by
//! explicitly loaded plugins, and may be overridden (last registration wins), but are
//! never removed during the life of the process.

use crate::plugins::{ExtractorFactory, ExtractorPlugin};
use crate::{Result, UnifileError};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Normalize an extension key: trim, drop leading dots, lowercase.
///
/// # Errors
///
/// Returns `Validation` if the result is empty or contains whitespace, a dot or a
/// path separator.
pub fn normalize_extension(raw: &str) -> Result<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();

    if ext.is_empty() {
        return Err(UnifileError::validation(format!("Extension '{}' is empty", raw)));
    }

    if ext.contains(char::is_whitespace) || ext.contains(['.', '/', '\\']) {
        return Err(UnifileError::validation(format!(
            "Extension '{}' must be a single suffix without whitespace or separators",
            raw
        )));
    }

    Ok(ext)
}

/// Lowercased final suffix of `path`, without the dot. `None` when there is none.
pub fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

struct RegistryEntry {
    factory: ExtractorFactory,
    origin: String,
}

/// Maps normalized extensions to extractor factories.
///
/// # Thread Safety
///
/// The registry itself is a plain value; the process-wide instance is wrapped in
/// `Arc<RwLock<_>>`. Dispatch holds the read lock only long enough to clone a factory.
///
/// # Example
///
/// ```rust
/// use unifile::plugins::{ExtractorRegistry, default_factory};
/// use unifile::extractors::TextExtractor;
///
/// let mut registry = ExtractorRegistry::new();
/// registry.register("notes", default_factory::<TextExtractor>()).unwrap();
/// assert_eq!(registry.resolve(std::path::Path::new("today.NOTES")).as_deref(), Some("notes"));
/// ```
#[derive(Default)]
pub struct ExtractorRegistry {
    entries: BTreeMap<String, RegistryEntry>,
    plugins: IndexMap<String, Vec<String>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &self.entries.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::extractors::register_default_extractors(&mut registry);
        registry
    }

    /// Register a factory for an extension. An existing entry is replaced.
    pub fn register(&mut self, extension: &str, factory: ExtractorFactory) -> Result<()> {
        self.register_from(extension, factory, "builtin")
    }

    pub(crate) fn register_from(&mut self, extension: &str, factory: ExtractorFactory, origin: &str) -> Result<()> {
        let ext = normalize_extension(extension)?;
        if let Some(previous) = self.entries.get(&ext) {
            tracing::debug!(
                extension = %ext,
                previous = %previous.origin,
                origin = %origin,
                "Overriding extractor registration"
            );
        }
        self.entries.insert(
            ext,
            RegistryEntry {
                factory,
                origin: origin.to_string(),
            },
        );
        Ok(())
    }

    /// Merge every registration contributed by `plugin`.
    ///
    /// All extensions are validated before any is inserted, so a plugin with one bad
    /// key contributes nothing.
    ///
    /// # Returns
    ///
    /// The number of extensions registered.
    pub fn register_plugin(&mut self, plugin: &dyn ExtractorPlugin) -> Result<usize> {
        let plugin_name = plugin.name().to_string();
        if plugin_name.is_empty() || plugin_name.contains(char::is_whitespace) {
            return Err(UnifileError::Plugin {
                message: "Plugin name cannot be empty or contain whitespace".to_string(),
                plugin_name,
            });
        }

        let contributed = plugin.extractors();
        let mut validated = Vec::with_capacity(contributed.len());
        for (extension, factory) in contributed {
            let ext = normalize_extension(&extension).map_err(|e| UnifileError::Plugin {
                message: e.to_string(),
                plugin_name: plugin_name.clone(),
            })?;
            validated.push((ext, factory));
        }

        let count = validated.len();
        let mut extensions = Vec::with_capacity(count);
        for (ext, factory) in validated {
            self.register_from(&ext, factory, &plugin_name)?;
            extensions.push(ext);
        }

        tracing::info!(
            plugin = %plugin_name,
            version = %plugin.version(),
            extensions = ?extensions,
            "Registered extractor plugin"
        );
        self.plugins.entry(plugin_name).or_default().extend(extensions);
        Ok(count)
    }

    /// Extension for `path` if a factory is registered for it.
    pub fn resolve(&self, path: &Path) -> Option<String> {
        path_extension(path).filter(|ext| self.entries.contains_key(ext))
    }

    /// Factory registered for a normalized extension.
    pub fn factory(&self, extension: &str) -> Option<ExtractorFactory> {
        self.entries.get(extension).map(|entry| Arc::clone(&entry.factory))
    }

    /// Who registered the current entry for `extension` ("builtin" or a plugin name).
    pub fn origin(&self, extension: &str) -> Option<&str> {
        self.entries.get(extension).map(|entry| entry.origin.as_str())
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.entries.contains_key(extension)
    }

    /// All registered extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Names of loaded plugins, in load order.
    pub fn plugins(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Global extractor registry, seeded with the built-in extractors.
pub static EXTRACTOR_REGISTRY: Lazy<Arc<RwLock<ExtractorRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(ExtractorRegistry::with_defaults())));

/// Get the global extractor registry.
pub fn get_extractor_registry() -> Arc<RwLock<ExtractorRegistry>> {
    Arc::clone(&EXTRACTOR_REGISTRY)
}

/// Register a factory in the global registry.
///
/// The extension is dispatchable immediately afterwards.
///
/// # Example
///
/// ```rust
/// use unifile::plugins::{register_extractor, default_factory};
/// use unifile::extractors::TextExtractor;
///
/// register_extractor("diary", default_factory::<TextExtractor>()).unwrap();
/// assert!(unifile::plugins::list_extensions().unwrap().contains(&"diary".to_string()));
/// ```
pub fn register_extractor(extension: &str, factory: ExtractorFactory) -> Result<()> {
    let registry = get_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| UnifileError::LockPoisoned(format!("Extractor registry lock poisoned: {}", e)))?;
    registry.register_from(extension, factory, "runtime")
}

/// Register one plugin in the global registry.
pub fn register_plugin(plugin: &dyn ExtractorPlugin) -> Result<usize> {
    let registry = get_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| UnifileError::LockPoisoned(format!("Extractor registry lock poisoned: {}", e)))?;
    registry.register_plugin(plugin)
}

/// Load a known list of plugin sources, in order.
///
/// Later plugins override earlier ones for shared extensions. Stops at the first
/// plugin that fails validation; plugins loaded before it stay registered.
pub fn load_plugins(plugins: &[&dyn ExtractorPlugin]) -> Result<usize> {
    let mut total = 0;
    for plugin in plugins {
        total += register_plugin(*plugin)?;
    }
    Ok(total)
}

/// Extensions currently dispatchable through the global registry, sorted.
pub fn list_extensions() -> Result<Vec<String>> {
    let registry = get_extractor_registry();
    let registry = registry
        .read()
        .map_err(|e| UnifileError::LockPoisoned(format!("Extractor registry lock poisoned: {}", e)))?;
    Ok(registry.supported_extensions())
}

/// Names of plugins loaded into the global registry.
pub fn list_plugins() -> Result<Vec<String>> {
    let registry = get_extractor_registry();
    let registry = registry
        .read()
        .map_err(|e| UnifileError::LockPoisoned(format!("Extractor registry lock poisoned: {}", e)))?;
    Ok(registry.plugins())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::ExtractionContext;
    use crate::plugins::{Extractor, extractor_factory};
    use crate::types::{Unit, UnitType};

    struct Fixed(&'static str);

    impl Extractor for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
            Ok(vec![Unit::ok(path, "", UnitType::File, "0", self.0)])
        }
    }

    struct TwoFormats;

    impl ExtractorPlugin for TwoFormats {
        fn name(&self) -> &str {
            "two-formats"
        }

        fn extractors(&self) -> Vec<(String, ExtractorFactory)> {
            vec![
                ("foo".to_string(), extractor_factory(|| Fixed("foo"))),
                (".BAR".to_string(), extractor_factory(|| Fixed("bar"))),
            ]
        }
    }

    struct BadPlugin;

    impl ExtractorPlugin for BadPlugin {
        fn name(&self) -> &str {
            "bad"
        }

        fn extractors(&self) -> Vec<(String, ExtractorFactory)> {
            vec![
                ("ok".to_string(), extractor_factory(|| Fixed("ok"))),
                ("tar.gz".to_string(), extractor_factory(|| Fixed("nope"))),
            ]
        }
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PDF").unwrap(), "pdf");
        assert_eq!(normalize_extension(" md ").unwrap(), "md");
        assert!(normalize_extension("").is_err());
        assert!(normalize_extension(".").is_err());
        assert!(normalize_extension("tar.gz").is_err());
        assert!(normalize_extension("a b").is_err());
    }

    #[test]
    fn test_resolve_lowercases_suffix() {
        let mut registry = ExtractorRegistry::new();
        registry.register("txt", extractor_factory(|| Fixed("t"))).unwrap();

        assert_eq!(registry.resolve(Path::new("/x/NOTES.TXT")).as_deref(), Some("txt"));
        assert_eq!(registry.resolve(Path::new("/x/notes.qqq")), None);
        assert_eq!(registry.resolve(Path::new("/x/noext")), None);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ExtractorRegistry::new();
        registry.register("txt", extractor_factory(|| Fixed("first"))).unwrap();
        registry.register("TXT", extractor_factory(|| Fixed("second"))).unwrap();

        assert_eq!(registry.len(), 1);
        let extractor = (registry.factory("txt").unwrap())();
        assert_eq!(extractor.name(), "second");
    }

    #[test]
    fn test_factories_build_fresh_instances() {
        let mut registry = ExtractorRegistry::new();
        registry.register("txt", extractor_factory(|| Fixed("t"))).unwrap();
        let factory = registry.factory("txt").unwrap();
        let a = factory();
        let b = factory();
        let pa = &*a as *const dyn Extractor as *const u8;
        let pb = &*b as *const dyn Extractor as *const u8;
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_register_plugin_adds_and_records_origin() {
        let mut registry = ExtractorRegistry::new();
        let count = registry.register_plugin(&TwoFormats).unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.supported_extensions(), vec!["bar".to_string(), "foo".to_string()]);
        assert_eq!(registry.origin("bar"), Some("two-formats"));
        assert_eq!(registry.plugins(), vec!["two-formats".to_string()]);
    }

    #[test]
    fn test_plugin_with_invalid_extension_contributes_nothing() {
        let mut registry = ExtractorRegistry::new();
        let err = registry.register_plugin(&BadPlugin).unwrap_err();

        assert!(matches!(err, UnifileError::Plugin { .. }));
        assert!(registry.is_empty());
        assert!(registry.plugins().is_empty());
    }

    #[test]
    fn test_defaults_cover_core_formats() {
        let registry = ExtractorRegistry::with_defaults();
        for ext in ["txt", "md", "json", "csv", "xml", "png", "mp3"] {
            assert!(registry.contains(ext), "missing {}", ext);
        }
        let extensions = registry.supported_extensions();
        let mut sorted = extensions.clone();
        sorted.sort();
        assert_eq!(extensions, sorted);
    }
}
