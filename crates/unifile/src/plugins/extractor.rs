//! The extractor contract and its factory type.

use std::path::Path;
use std::sync::Arc;

use crate::Result;
use crate::core::config::{ExtractorSettings, RuntimeOption};
use crate::core::dispatch::ExtractionContext;
use crate::types::Unit;

/// A format backend turning one file into units.
///
/// A fresh instance is built for every dispatch through its [`ExtractorFactory`], so
/// implementations may keep per-call state in `self` without synchronization.
///
/// # Error contract
///
/// Expected failures (a corrupt page, a missing helper binary, an undecodable line)
/// must be reported as units with `status = error`. Returning `Err` means the call
/// itself is invalid and aborts the whole dispatch.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use unifile::plugins::Extractor;
/// use unifile::core::dispatch::ExtractionContext;
/// use unifile::types::{Unit, UnitType};
/// use unifile::Result;
///
/// struct Upper;
///
/// impl Extractor for Upper {
///     fn name(&self) -> &str {
///         "upper"
///     }
///
///     fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
///         let text = std::fs::read_to_string(path)?.to_uppercase();
///         Ok(vec![Unit::ok(path, "up", UnitType::File, "0", text)])
///     }
/// }
/// ```
pub trait Extractor: Send {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Runtime options this extractor wants to receive in [`configure`](Self::configure).
    fn accepted_options(&self) -> &[RuntimeOption] {
        &[]
    }

    /// Receive the declared subset of the resolved snapshot before `extract` runs.
    fn configure(&mut self, _settings: &ExtractorSettings) {}

    fn extract(&self, path: &Path, ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>>;
}

/// Zero-argument constructor for a fresh extractor.
pub type ExtractorFactory = Arc<dyn Fn() -> Box<dyn Extractor> + Send + Sync>;

/// Wrap a constructor closure as an [`ExtractorFactory`].
pub fn extractor_factory<E, F>(make: F) -> ExtractorFactory
where
    E: Extractor + 'static,
    F: Fn() -> E + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Extractor>)
}

/// Factory for any `Default` extractor.
pub fn default_factory<E>() -> ExtractorFactory
where
    E: Extractor + Default + 'static,
{
    extractor_factory(E::default)
}

/// A source of extractor registrations, loaded explicitly at startup.
pub trait ExtractorPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> String {
        "0.0.0".to_string()
    }

    /// Extension to factory pairs contributed by this plugin.
    fn extractors(&self) -> Vec<(String, ExtractorFactory)>;
}
