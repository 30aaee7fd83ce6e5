//! Extractor plugin system.
//!
//! Every format backend implements [`Extractor`]. The [`ExtractorRegistry`] maps file
//! extensions to [`ExtractorFactory`] closures that build a fresh extractor per dispatch.
//! Third-party formats are added either one at a time with [`register_extractor`] or as
//! a bundle through an [`ExtractorPlugin`] passed to [`load_plugins`].
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use unifile::core::dispatch::ExtractionContext;
//! use unifile::plugins::{Extractor, ExtractorFactory, ExtractorPlugin, extractor_factory, load_plugins};
//! use unifile::types::{Unit, UnitType};
//! use unifile::Result;
//!
//! struct Yaml;
//!
//! impl Extractor for Yaml {
//!     fn name(&self) -> &str {
//!         "yaml"
//!     }
//!
//!     fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
//!         let text = std::fs::read_to_string(path)?;
//!         Ok(vec![Unit::ok(path, "yaml", UnitType::File, "0", text)])
//!     }
//! }
//!
//! struct YamlPlugin;
//!
//! impl ExtractorPlugin for YamlPlugin {
//!     fn name(&self) -> &str {
//!         "yaml-plugin"
//!     }
//!
//!     fn extractors(&self) -> Vec<(String, ExtractorFactory)> {
//!         vec![
//!             ("yaml".to_string(), extractor_factory(|| Yaml)),
//!             ("yml".to_string(), extractor_factory(|| Yaml)),
//!         ]
//!     }
//! }
//!
//! load_plugins(&[&YamlPlugin]).unwrap();
//! ```

pub mod extractor;
pub mod registry;

pub use extractor::{Extractor, ExtractorFactory, ExtractorPlugin, default_factory, extractor_factory};
pub use registry::{
    EXTRACTOR_REGISTRY, ExtractorRegistry, get_extractor_registry, list_extensions, list_plugins, load_plugins,
    normalize_extension, path_extension, register_extractor, register_plugin,
};
