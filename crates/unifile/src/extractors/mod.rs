//! Built-in extractors.
//!
//! Each extractor turns one file into units and reports content-level failures as
//! error units rather than `Err`. All of them are registered into every
//! [`ExtractorRegistry::with_defaults`] registry; plugins may replace any of them.

#[cfg(feature = "archives")]
pub mod archive;
pub mod delimited;
pub mod html;
pub mod media;
pub mod ocr;
pub mod structured;
pub mod text;
pub mod xml;

#[cfg(feature = "archives")]
pub use archive::ArchiveExtractor;
pub use delimited::DelimitedExtractor;
pub use html::HtmlExtractor;
pub use media::MediaExtractor;
pub use ocr::ImageExtractor;
pub use structured::JsonExtractor;
pub use text::TextExtractor;
pub use xml::XmlExtractor;

use std::path::Path;

use crate::UnifileError;
use crate::plugins::{ExtractorFactory, ExtractorRegistry, default_factory};
use crate::types::Unit;

/// A whole-file failure as the single unit for `path`.
pub(crate) fn failure(path: &Path, err: UnifileError) -> Vec<Unit> {
    vec![Unit::file_failure(path, "", &err)]
}

/// Read `path` as text, replacing invalid UTF-8.
pub(crate) fn read_text(path: &Path) -> std::result::Result<String, UnifileError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn builtin_extractors() -> Vec<(&'static [&'static str], ExtractorFactory)> {
    #[cfg_attr(not(feature = "archives"), allow(unused_mut))]
    let mut list: Vec<(&'static [&'static str], ExtractorFactory)> = vec![
        (text::EXTENSIONS, default_factory::<TextExtractor>()),
        (structured::EXTENSIONS, default_factory::<JsonExtractor>()),
        (delimited::EXTENSIONS, default_factory::<DelimitedExtractor>()),
        (xml::EXTENSIONS, default_factory::<XmlExtractor>()),
        (html::EXTENSIONS, default_factory::<HtmlExtractor>()),
        (ocr::EXTENSIONS, default_factory::<ImageExtractor>()),
        (media::EXTENSIONS, default_factory::<MediaExtractor>()),
    ];
    #[cfg(feature = "archives")]
    list.push((archive::EXTENSIONS, default_factory::<ArchiveExtractor>()));
    list
}

/// Register every built-in extractor into `registry`.
pub fn register_default_extractors(registry: &mut ExtractorRegistry) {
    for (extensions, factory) in builtin_extractors() {
        for extension in extensions {
            if let Err(e) = registry.register(extension, factory.clone()) {
                tracing::warn!(extension = %extension, error = %e, "Failed to register built-in extractor");
            }
        }
    }
}
